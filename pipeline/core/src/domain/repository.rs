// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0
//! # Trajectory Repository Interface
//!
//! Persistence contract for trajectory snapshots, following the repository
//! pattern: interface in the domain layer, implementations in
//! `crate::infrastructure::repositories`.
//!
//! The store is append-only from the pipeline's point of view: every write
//! inserts new rows stamped with a creation timestamp (a re-released record
//! never overwrites an earlier snapshot), and reads reduce the freshness
//! window to the latest row per `uav_id`.

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::domain::trajectory::Trajectory;

#[async_trait]
pub trait TrajectoryRepository: Send + Sync {
    /// Insert every record in the batch as a new row, stamped with the
    /// current time. Pre-existing storage identity is never reused.
    async fn insert_many(&self, batch: &[Trajectory]) -> Result<(), RepositoryError>;

    /// Latest snapshot per aircraft within the freshness window — the "last
    /// known state of the whole fleet", not just one reporter.
    async fn recent_snapshot(&self, window: Duration) -> Result<Vec<Trajectory>, RepositoryError>;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
