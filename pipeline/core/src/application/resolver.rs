// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Mutate Stage
//!
//! Thin transport wrapper around the pure resolution state machine in
//! `domain::resolution`: run the escalation guard, apply the next unused
//! strategy, then hand the batch back to Detect for re-evaluation. A guard
//! or precondition failure abandons the cycle here — no downstream call.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::application::dispatch::StageClient;
use crate::domain::abilities::AbilityTable;
use crate::domain::config::{DetectionConfig, ResolutionConfig};
use crate::domain::envelope::Envelope;
use crate::domain::resolution;

pub struct ResolverService {
    abilities: Arc<AbilityTable>,
    resolution: ResolutionConfig,
    detection: DetectionConfig,
    stages: Arc<dyn StageClient>,
}

impl ResolverService {
    pub fn new(
        abilities: Arc<AbilityTable>,
        resolution: ResolutionConfig,
        detection: DetectionConfig,
        stages: Arc<dyn StageClient>,
    ) -> Self {
        Self { abilities, resolution, detection, stages }
    }

    pub async fn mutate(&self, envelope: Envelope) -> Result<()> {
        let (mutated, meta) = {
            let mut rng = rand::rng();
            resolution::resolve(
                &envelope.data,
                &envelope.meta,
                &self.abilities,
                self.detection.vertical_separation,
                self.resolution.max_mutations,
                &mut rng,
            )?
        };
        info!(
            mutations = meta.mutations,
            mask = %meta.mutation_cases.unwrap_or_default(),
            "strategy applied, re-submitting for detection"
        );

        let next = Envelope::new(mutated, meta);
        if let Err(e) = self.stages.post_detect(&next).await {
            error!(error = %e, "failed to call detect stage");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordedCall, RecordingStageClient};
    use crate::domain::envelope::{Meta, StrategyMask};
    use crate::domain::trajectory::{Origin, Trajectory};

    fn resolver(stages: Arc<RecordingStageClient>) -> ResolverService {
        ResolverService::new(
            Arc::new(AbilityTable::default()),
            ResolutionConfig::default(),
            DetectionConfig::default(),
            stages,
        )
    }

    fn flagged_pair() -> Vec<Trajectory> {
        vec![
            Trajectory::new("uav-1", "quad", 0.0, 0.0, 1000.0, 40.0, 0.0, 0.0).flagged(),
            Trajectory::new("uav-2", "quad", 0.0, 0.001, 1000.0, 40.0, 0.0, 0.0).flagged(),
        ]
    }

    #[tokio::test]
    async fn first_mutation_forwards_system_batch_to_detect() {
        let stages = Arc::new(RecordingStageClient::default());
        resolver(stages.clone())
            .mutate(Envelope::new(flagged_pair(), Meta::new(Origin::SelfReport)))
            .await
            .unwrap();

        let calls = stages.calls().await;
        match calls.as_slice() {
            [RecordedCall::Detect(env)] => {
                assert_eq!(env.meta.origin, Origin::System);
                assert_eq!(env.meta.mutations, Some(1));
                assert_eq!(env.meta.mutation_cases, Some(StrategyMask::REDUCE_SPEED));
                assert!(env.data.iter().all(|t| !t.in_conflict()));
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn ceiling_abort_makes_no_downstream_call() {
        let stages = Arc::new(RecordingStageClient::default());
        let mut meta = Meta::new(Origin::System);
        meta.mutations = Some(101);
        let err = resolver(stages.clone())
            .mutate(Envelope::new(flagged_pair(), meta))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("abandoning lineage"));
        assert!(stages.calls().await.is_empty());
    }

    #[tokio::test]
    async fn precondition_failure_abandons_the_cycle() {
        let stages = Arc::new(RecordingStageClient::default());
        // Only one flagged conflict: no lower-priority UAV to pick.
        let data = vec![flagged_pair().remove(0)];
        let err = resolver(stages.clone())
            .mutate(Envelope::new(data, Meta::new(Origin::SelfReport)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not enough flagged conflicts"));
        assert!(stages.calls().await.is_empty());
    }
}
