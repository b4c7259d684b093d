// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Recording doubles for the dispatch ports, shared by the stage tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::dispatch::{ReleasePublisher, StageClient};
use crate::domain::envelope::Envelope;
use crate::domain::trajectory::Trajectory;

#[derive(Debug, Clone)]
pub enum RecordedCall {
    Detect(Envelope),
    Mutate(Envelope),
    Release(Envelope),
    Update(Envelope),
    Trigger(Envelope),
}

#[derive(Default)]
pub struct RecordingStageClient {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingStageClient {
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl StageClient for RecordingStageClient {
    async fn post_detect(&self, envelope: &Envelope) -> Result<()> {
        self.calls.lock().await.push(RecordedCall::Detect(envelope.clone()));
        Ok(())
    }
    async fn post_mutate(&self, envelope: &Envelope) -> Result<()> {
        self.calls.lock().await.push(RecordedCall::Mutate(envelope.clone()));
        Ok(())
    }
    async fn post_release(&self, envelope: &Envelope) -> Result<()> {
        self.calls.lock().await.push(RecordedCall::Release(envelope.clone()));
        Ok(())
    }
    async fn post_update(&self, envelope: &Envelope) -> Result<()> {
        self.calls.lock().await.push(RecordedCall::Update(envelope.clone()));
        Ok(())
    }
    async fn post_trigger(&self, envelope: &Envelope) -> Result<()> {
        self.calls.lock().await.push(RecordedCall::Trigger(envelope.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Vec<Trajectory>>>,
}

impl RecordingPublisher {
    pub async fn published(&self) -> Vec<Vec<Trajectory>> {
        self.published.lock().await.clone()
    }
}

#[async_trait]
impl ReleasePublisher for RecordingPublisher {
    async fn publish(&self, batch: &[Trajectory]) -> Result<()> {
        self.published.lock().await.push(batch.to_vec());
        Ok(())
    }
}

/// Publisher that always fails, for the non-fatal-publish path.
pub struct FailingPublisher;

#[async_trait]
impl ReleasePublisher for FailingPublisher {
    async fn publish(&self, _batch: &[Trajectory]) -> Result<()> {
        Err(anyhow!("broker unavailable"))
    }
}
