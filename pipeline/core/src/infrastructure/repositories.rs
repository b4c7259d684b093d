// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Trajectory Repositories
//!
//! Implementations of the domain `TrajectoryRepository`: an in-memory store
//! for development and testing, and a PostgreSQL store for production.
//! Writes are always inserts — a record's storage identity is never reused,
//! so a re-released trajectory lands as a new row and the freshness query
//! picks the latest row per aircraft.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::envelope::StrategyMask;
use crate::domain::repository::{RepositoryError, TrajectoryRepository};
use crate::domain::trajectory::{Origin, Trajectory};

// ============================================================================
// In-Memory
// ============================================================================

#[derive(Default)]
pub struct InMemoryTrajectoryRepository {
    rows: Arc<RwLock<Vec<(DateTime<Utc>, Trajectory)>>>,
}

impl InMemoryTrajectoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrajectoryRepository for InMemoryTrajectoryRepository {
    async fn insert_many(&self, batch: &[Trajectory]) -> Result<(), RepositoryError> {
        // One creation timestamp per batch, matching the write semantics of
        // the SQL implementation.
        let created_at = Utc::now();
        let mut rows = self.rows.write().await;
        for trajectory in batch {
            rows.push((created_at, trajectory.clone()));
        }
        Ok(())
    }

    async fn recent_snapshot(&self, window: Duration) -> Result<Vec<Trajectory>, RepositoryError> {
        let cutoff = Utc::now() - window;
        let rows = self.rows.read().await;

        // Latest row per uav_id; on equal timestamps the later insert wins
        // (arrival order, not a vector clock).
        let mut latest: Vec<(DateTime<Utc>, Trajectory)> = Vec::new();
        for (created_at, trajectory) in rows.iter().filter(|(at, _)| *at >= cutoff) {
            match latest.iter_mut().find(|(_, t)| t.uav_id == trajectory.uav_id) {
                Some(entry) if entry.0 <= *created_at => {
                    *entry = (*created_at, trajectory.clone());
                }
                Some(_) => {}
                None => latest.push((*created_at, trajectory.clone())),
            }
        }
        Ok(latest.into_iter().map(|(_, t)| t).collect())
    }
}

// ============================================================================
// PostgreSQL
// ============================================================================

pub struct PostgresTrajectoryRepository {
    pool: PgPool,
}

impl PostgresTrajectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the trajectories table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trajectories (
                id              BIGSERIAL PRIMARY KEY,
                uav_id          TEXT NOT NULL,
                uav_type        TEXT NOT NULL,
                latitude        DOUBLE PRECISION NOT NULL,
                longitude       DOUBLE PRECISION NOT NULL,
                altitude        DOUBLE PRECISION NOT NULL,
                speed           DOUBLE PRECISION NOT NULL,
                direction       DOUBLE PRECISION NOT NULL,
                vertical_speed  DOUBLE PRECISION NOT NULL,
                origin          TEXT,
                mutation_cases  TEXT,
                created_at      TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to ensure schema: {e}")))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS trajectories_uav_recency
                ON trajectories (uav_id, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to ensure index: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl TrajectoryRepository for PostgresTrajectoryRepository {
    async fn insert_many(&self, batch: &[Trajectory]) -> Result<(), RepositoryError> {
        let created_at = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Unreachable(e.to_string()))?;

        for t in batch {
            sqlx::query(
                r#"
                INSERT INTO trajectories (
                    uav_id, uav_type, latitude, longitude, altitude,
                    speed, direction, vertical_speed, origin, mutation_cases, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(t.uav_id.as_str())
            .bind(&t.uav_type)
            .bind(t.latitude)
            .bind(t.longitude)
            .bind(t.altitude)
            .bind(t.speed)
            .bind(t.direction)
            .bind(t.vertical_speed)
            .bind(t.origin.map(|o| o.to_string()))
            .bind(t.mutation_cases.map(|m| m.to_string()))
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("failed to insert trajectory: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(format!("failed to commit batch: {e}")))?;
        debug!(batch = batch.len(), "stored trajectory batch");
        Ok(())
    }

    async fn recent_snapshot(&self, window: Duration) -> Result<Vec<Trajectory>, RepositoryError> {
        let cutoff = Utc::now() - window;
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (uav_id)
                uav_id, uav_type, latitude, longitude, altitude,
                speed, direction, vertical_speed, origin, mutation_cases
            FROM trajectories
            WHERE created_at >= $1
            ORDER BY uav_id, created_at DESC, id DESC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Unreachable(format!("snapshot query failed: {e}")))?;

        rows.into_iter()
            .map(|row| {
                let origin = row
                    .get::<Option<String>, _>("origin")
                    .map(|s| parse_origin(&s))
                    .transpose()?;
                let mask = row
                    .get::<Option<String>, _>("mutation_cases")
                    .map(|s| {
                        StrategyMask::parse(&s)
                            .map_err(|e| RepositoryError::Serialization(e.to_string()))
                    })
                    .transpose()?;

                let mut t = Trajectory::new(
                    row.get::<String, _>("uav_id"),
                    row.get::<String, _>("uav_type"),
                    row.get("latitude"),
                    row.get("longitude"),
                    row.get("altitude"),
                    row.get("speed"),
                    row.get("direction"),
                    row.get("vertical_speed"),
                );
                t.origin = origin;
                t.mutation_cases = mask;
                Ok(t)
            })
            .collect()
    }
}

fn parse_origin(s: &str) -> Result<Origin, RepositoryError> {
    match s {
        "self_report" => Ok(Origin::SelfReport),
        "system" => Ok(Origin::System),
        "mutate" => Ok(Origin::Mutate),
        other => Err(RepositoryError::Serialization(format!("unknown origin `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uav(id: &str, speed: f64) -> Trajectory {
        Trajectory::new(id, "quad", 0.0, 0.0, 1000.0, speed, 0.0, 0.0)
    }

    #[tokio::test]
    async fn snapshot_reduces_to_latest_row_per_uav() {
        let repo = InMemoryTrajectoryRepository::new();
        repo.insert_many(&[uav("uav-1", 40.0), uav("uav-2", 50.0)]).await.unwrap();
        repo.insert_many(&[uav("uav-1", 30.0)]).await.unwrap();

        let snapshot = repo.recent_snapshot(Duration::seconds(100)).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        let uav1 = snapshot.iter().find(|t| t.uav_id.as_str() == "uav-1").unwrap();
        assert_eq!(uav1.speed, 30.0);
    }

    #[tokio::test]
    async fn snapshot_excludes_rows_outside_the_window() {
        let repo = InMemoryTrajectoryRepository::new();
        repo.insert_many(&[uav("uav-1", 40.0)]).await.unwrap();
        // A zero-width window excludes everything already written.
        let snapshot = repo.recent_snapshot(Duration::seconds(0)).await.unwrap();
        assert!(snapshot.len() <= 1);
        let snapshot = repo.recent_snapshot(Duration::seconds(-1)).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn same_timestamp_last_insert_wins() {
        let repo = InMemoryTrajectoryRepository::new();
        // Same batch, same uav twice: one timestamp, arrival order decides.
        repo.insert_many(&[uav("uav-1", 40.0), uav("uav-1", 20.0)]).await.unwrap();
        let snapshot = repo.recent_snapshot(Duration::seconds(100)).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].speed, 20.0);
    }
}
