// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

pub mod abilities;
pub mod config;
pub mod envelope;
pub mod geometry;
pub mod repository;
pub mod resolution;
pub mod trajectory;

pub use abilities::AbilityTable;
pub use config::PipelineConfig;
pub use envelope::{Envelope, Meta, ProtocolError, StrategyMask};
pub use trajectory::{Origin, Trajectory, UavId};
