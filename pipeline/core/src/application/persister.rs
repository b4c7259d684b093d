// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Update Stage
//!
//! Writes the batch to the store and decides whether a new resolution cycle
//! starts. A `self_report` batch triggers the Activator *after* the write
//! completes — the trigger's subsequent read must observe this write, so the
//! two must never be parallelized. A `system` batch (the release path) is
//! stored terminally with no trigger, which is what breaks the cycle and
//! prevents infinite retriggering of already-resolved batches.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::application::dispatch::StageClient;
use crate::domain::envelope::{Envelope, ProtocolError};
use crate::domain::repository::TrajectoryRepository;
use crate::domain::trajectory::Origin;

/// What the Update stage did with the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Release path: stored, cycle ends here.
    Stored,
    /// Fresh report: stored, then the Activator was invoked.
    StoredAndTriggered,
}

pub struct PersisterService {
    repository: Arc<dyn TrajectoryRepository>,
    stages: Arc<dyn StageClient>,
}

impl PersisterService {
    pub fn new(repository: Arc<dyn TrajectoryRepository>, stages: Arc<dyn StageClient>) -> Self {
        Self { repository, stages }
    }

    pub async fn update(&self, envelope: Envelope) -> Result<PersistOutcome> {
        match envelope.meta.origin {
            Origin::System => {
                info!(batch = envelope.data.len(), "storing released data, no trigger");
                self.repository.insert_many(&envelope.data).await?;
                Ok(PersistOutcome::Stored)
            }
            Origin::SelfReport => {
                info!(batch = envelope.data.len(), "storing reported data");
                // The write blocks the trigger: Trigger's read must see it.
                self.repository.insert_many(&envelope.data).await?;

                let next = Envelope::new(Vec::new(), envelope.meta);
                if let Err(e) = self.stages.post_trigger(&next).await {
                    error!(error = %e, "failed to call trigger stage");
                }
                Ok(PersistOutcome::StoredAndTriggered)
            }
            other => {
                error!(origin = %other, "unknown origin at update stage");
                Err(ProtocolError::UnexpectedOrigin { stage: "update", origin: other }.into())
            }
        }
    }
}
