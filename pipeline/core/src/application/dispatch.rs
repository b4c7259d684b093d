// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Dispatch Ports
//!
//! Transport-facing traits the stage services depend on. Implementations
//! live in `crate::infrastructure` (HTTP stage client, MQTT publisher);
//! tests substitute recording mocks.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::envelope::Envelope;
use crate::domain::trajectory::Trajectory;

/// Fire-and-forget calls to the next stage.
///
/// A returned `Ok` means the hop *accepted* the envelope, nothing more; the
/// business outcome is only observable through the next stage's behavior.
#[async_trait]
pub trait StageClient: Send + Sync {
    async fn post_detect(&self, envelope: &Envelope) -> Result<()>;
    async fn post_mutate(&self, envelope: &Envelope) -> Result<()>;
    async fn post_release(&self, envelope: &Envelope) -> Result<()>;
    async fn post_update(&self, envelope: &Envelope) -> Result<()>;
    async fn post_trigger(&self, envelope: &Envelope) -> Result<()>;
}

/// At-least-once publication of released trajectories to all observers.
/// Consumers must tolerate duplicate delivery (last write wins per `uav_id`).
#[async_trait]
pub trait ReleasePublisher: Send + Sync {
    async fn publish(&self, batch: &[Trajectory]) -> Result<()>;
}
