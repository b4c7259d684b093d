// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Release Stage
//!
//! Publishes the actually-changed trajectories to all observers and forwards
//! the same filtered set to Update. Only aircraft stamped `origin == mutate`
//! leave this stage — unmutated members of the batch are dropped. A publish
//! failure is logged and never blocks the forward call.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::application::dispatch::{ReleasePublisher, StageClient};
use crate::domain::envelope::Envelope;
use crate::domain::trajectory::Origin;

pub struct ReleaserService {
    publisher: Arc<dyn ReleasePublisher>,
    stages: Arc<dyn StageClient>,
}

impl ReleaserService {
    pub fn new(publisher: Arc<dyn ReleasePublisher>, stages: Arc<dyn StageClient>) -> Self {
        Self { publisher, stages }
    }

    /// Returns the number of trajectories released.
    pub async fn release(&self, envelope: Envelope) -> Result<usize> {
        let mutated: Vec<_> = envelope
            .data
            .into_iter()
            .filter(|t| t.origin == Some(Origin::Mutate))
            .collect();
        info!(released = mutated.len(), "releasing mutated trajectories");

        if let Err(e) = self.publisher.publish(&mutated).await {
            error!(error = %e, "failed to publish to release topic");
        }

        let next = Envelope::new(mutated, envelope.meta);
        if let Err(e) = self.stages.post_update(&next).await {
            error!(error = %e, "failed to call update stage");
        }
        Ok(next.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{
        FailingPublisher, RecordedCall, RecordingPublisher, RecordingStageClient,
    };
    use crate::domain::envelope::{Meta, StrategyMask};
    use crate::domain::trajectory::Trajectory;

    fn mixed_batch() -> Vec<Trajectory> {
        let plain = Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 40.0, 0.0, 0.0);
        let mutated = Trajectory::new("uav-2", "quad", 0.0, 0.001, 1000.0, 30.0, 0.0, 0.0)
            .stamped_mutated(StrategyMask::REDUCE_SPEED);
        vec![plain, mutated]
    }

    #[tokio::test]
    async fn releases_only_mutated_trajectories() {
        let publisher = Arc::new(RecordingPublisher::default());
        let stages = Arc::new(RecordingStageClient::default());
        let released = ReleaserService::new(publisher.clone(), stages.clone())
            .release(Envelope::new(mixed_batch(), Meta::new(Origin::System)))
            .await
            .unwrap();
        assert_eq!(released, 1);

        let published = publisher.published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0][0].uav_id.as_str(), "uav-2");

        match stages.calls().await.as_slice() {
            [RecordedCall::Update(env)] => assert_eq!(env.data.len(), 1),
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_unmutated_batch_yields_empty_release() {
        let publisher = Arc::new(RecordingPublisher::default());
        let stages = Arc::new(RecordingStageClient::default());
        let data = vec![Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 40.0, 0.0, 0.0)];
        let released = ReleaserService::new(publisher.clone(), stages.clone())
            .release(Envelope::new(data, Meta::new(Origin::System)))
            .await
            .unwrap();
        assert_eq!(released, 0);
        assert!(publisher.published().await[0].is_empty());
    }

    #[tokio::test]
    async fn publish_failure_does_not_block_the_forward_call() {
        let stages = Arc::new(RecordingStageClient::default());
        ReleaserService::new(Arc::new(FailingPublisher), stages.clone())
            .release(Envelope::new(mixed_batch(), Meta::new(Origin::System)))
            .await
            .unwrap();
        assert!(matches!(stages.calls().await.as_slice(), [RecordedCall::Update(_)]));
    }
}
