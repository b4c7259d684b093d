// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

pub mod publisher;
pub mod report_ingester;
pub mod repositories;
pub mod stage_client;

pub use publisher::MqttReleasePublisher;
pub use report_ingester::ReportIngester;
pub use repositories::{InMemoryTrajectoryRepository, PostgresTrajectoryRepository};
pub use stage_client::HttpStageClient;
