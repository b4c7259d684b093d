// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Detect Stage
//!
//! Predicts near-future positions for the whole batch, flags pairwise
//! conflicts, and decides the next hop from the detection result plus the
//! batch's provenance:
//!
//! - conflict            -> Mutate (with the flagged batch)
//! - safe + `self_report` -> stop (nothing changed, nothing to release)
//! - safe + `system`      -> Release (the resolution cycle converged)
//! - safe + other origin  -> protocol error

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::application::dispatch::StageClient;
use crate::domain::config::DetectionConfig;
use crate::domain::envelope::{Envelope, ProtocolError};
use crate::domain::geometry::detect_collisions;
use crate::domain::trajectory::Origin;

/// The decision the Detect stage arrived at, for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// Safe and self-reported: the fleet needs no change.
    SafeAndStopped,
    /// Safe after resolution: forwarded to Release.
    ReleaseRequested,
    /// Conflict found: forwarded to Mutate.
    MutationRequested,
}

pub struct DetectorService {
    config: DetectionConfig,
    stages: Arc<dyn StageClient>,
}

impl DetectorService {
    pub fn new(config: DetectionConfig, stages: Arc<dyn StageClient>) -> Self {
        Self { config, stages }
    }

    pub async fn detect(&self, envelope: Envelope) -> Result<DetectionOutcome> {
        let origin = envelope.meta.origin;

        let (collision, flagged) = detect_collisions(
            &envelope.data,
            self.config.time_interval,
            self.config.num_steps,
            self.config.horizontal_separation,
            self.config.vertical_separation,
        );
        info!(collision, %origin, batch = flagged.len(), "collision detection finished");

        if collision {
            let next = Envelope::new(flagged, envelope.meta);
            if let Err(e) = self.stages.post_mutate(&next).await {
                error!(error = %e, "failed to call mutate stage");
            }
            return Ok(DetectionOutcome::MutationRequested);
        }

        match origin {
            Origin::SelfReport => {
                info!("safe and self-reported, nothing to do");
                Ok(DetectionOutcome::SafeAndStopped)
            }
            Origin::System => {
                info!("safe and from system, calling release");
                if let Err(e) = self.stages.post_release(&envelope).await {
                    error!(error = %e, "failed to call release stage");
                }
                Ok(DetectionOutcome::ReleaseRequested)
            }
            other => {
                error!(origin = %other, "origin is neither system nor self_report");
                Err(ProtocolError::UnexpectedOrigin { stage: "detect", origin: other }.into())
            }
        }
    }
}
