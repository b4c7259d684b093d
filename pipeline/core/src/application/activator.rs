// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Trigger Stage
//!
//! The only entry point into a resolution cycle. Accepts nothing but fresh
//! external reports (`origin == self_report`), stamps a new correlation
//! token, reads the freshness-windowed latest-per-aircraft snapshot of the
//! *whole fleet*, and feeds that snapshot to Detect. `system` and `mutate`
//! batches must never re-enter here — that is what keeps resolved batches
//! from retriggering themselves.

use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::application::dispatch::StageClient;
use crate::domain::envelope::{Envelope, ProtocolError};
use crate::domain::repository::TrajectoryRepository;
use crate::domain::trajectory::Origin;

pub struct ActivatorService {
    repository: Arc<dyn TrajectoryRepository>,
    stages: Arc<dyn StageClient>,
    freshness_window: Duration,
}

impl ActivatorService {
    pub fn new(
        repository: Arc<dyn TrajectoryRepository>,
        stages: Arc<dyn StageClient>,
        freshness_window: Duration,
    ) -> Self {
        Self { repository, stages, freshness_window }
    }

    /// Returns the number of trajectories forwarded to Detect.
    pub async fn trigger(&self, envelope: Envelope) -> Result<usize> {
        let mut meta = envelope.meta;
        if meta.origin != Origin::SelfReport {
            error!(origin = %meta.origin, "only self-reported batches may start a cycle");
            return Err(
                ProtocolError::UnexpectedOrigin { stage: "trigger", origin: meta.origin }.into()
            );
        }

        let request_id = Uuid::new_v4().to_string();
        info!(%request_id, "starting resolution cycle");
        meta.request_id = Some(request_id);

        // Includes the just-written report: Update awaits its store write
        // before invoking this stage.
        let snapshot = self.repository.recent_snapshot(self.freshness_window).await?;
        if snapshot.is_empty() {
            bail!("no recent trajectories found within the freshness window");
        }
        info!(fleet = snapshot.len(), "forwarding fleet snapshot to detect");

        let count = snapshot.len();
        let next = Envelope::new(snapshot, meta);
        if let Err(e) = self.stages.post_detect(&next).await {
            error!(error = %e, "failed to call detect stage");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordedCall, RecordingStageClient};
    use crate::domain::envelope::Meta;
    use crate::domain::trajectory::Trajectory;
    use crate::infrastructure::repositories::InMemoryTrajectoryRepository;

    fn activator(
        repo: Arc<InMemoryTrajectoryRepository>,
        stages: Arc<RecordingStageClient>,
    ) -> ActivatorService {
        ActivatorService::new(repo, stages, Duration::seconds(100))
    }

    fn uav(id: &str) -> Trajectory {
        Trajectory::new(id, "quad", 0.0, 0.0, 1000.0, 40.0, 0.0, 0.0)
    }

    #[tokio::test]
    async fn forwards_deduplicated_fleet_snapshot_with_request_id() {
        let repo = Arc::new(InMemoryTrajectoryRepository::new());
        // uav-1 reported twice: only the latest row counts.
        repo.insert_many(&[uav("uav-1"), uav("uav-2")]).await.unwrap();
        repo.insert_many(&[uav("uav-1").with_speed(20.0), uav("uav-3")]).await.unwrap();

        let stages = Arc::new(RecordingStageClient::default());
        let count = activator(repo, stages.clone())
            .trigger(Envelope::new(Vec::new(), Meta::new(Origin::SelfReport)))
            .await
            .unwrap();
        assert_eq!(count, 3);

        match stages.calls().await.as_slice() {
            [RecordedCall::Detect(env)] => {
                assert_eq!(env.data.len(), 3);
                assert!(env.meta.request_id.is_some());
                let latest =
                    env.data.iter().find(|t| t.uav_id.as_str() == "uav-1").unwrap();
                assert_eq!(latest.speed, 20.0);
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_non_self_report_origins() {
        let repo = Arc::new(InMemoryTrajectoryRepository::new());
        repo.insert_many(&[uav("uav-1")]).await.unwrap();
        let stages = Arc::new(RecordingStageClient::default());

        for origin in [Origin::System, Origin::Mutate] {
            let err = activator(repo.clone(), stages.clone())
                .trigger(Envelope::new(Vec::new(), Meta::new(origin)))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("unexpected origin"));
        }
        assert!(stages.calls().await.is_empty());
    }

    #[tokio::test]
    async fn empty_freshness_window_aborts() {
        let repo = Arc::new(InMemoryTrajectoryRepository::new());
        let stages = Arc::new(RecordingStageClient::default());
        let err = activator(repo, stages.clone())
            .trigger(Envelope::new(Vec::new(), Meta::new(Origin::SelfReport)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no recent trajectories"));
        assert!(stages.calls().await.is_empty());
    }
}
