// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Stage API
//!
//! One POST endpoint per stage. Every endpoint acknowledges with an
//! immediate `202 Accepted` and runs the stage on a spawned task: the ack
//! means "envelope taken", never business success — the business outcome is
//! only observable in the logs and in the next hop's behavior.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use crate::application::{
    ActivatorService, DetectorService, PersisterService, ReleaserService, ResolverService,
};
use crate::domain::envelope::Envelope;

pub struct AppState {
    pub detector: Arc<DetectorService>,
    pub resolver: Arc<ResolverService>,
    pub releaser: Arc<ReleaserService>,
    pub persister: Arc<PersisterService>,
    pub activator: Arc<ActivatorService>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .route("/mutate", post(mutate))
        .route("/release", post(release))
        .route("/update", post(update))
        .route("/trigger", post(trigger))
        .route("/health", get(health))
        .with_state(state)
}

fn accepted(stage: &'static str) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted", "stage": stage })))
}

async fn detect(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> impl IntoResponse {
    let detector = state.detector.clone();
    tokio::spawn(async move {
        if let Err(e) = detector.detect(envelope).await {
            error!(stage = "detect", error = %e, "stage failed");
        }
    });
    accepted("detect")
}

async fn mutate(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> impl IntoResponse {
    let resolver = state.resolver.clone();
    tokio::spawn(async move {
        if let Err(e) = resolver.mutate(envelope).await {
            error!(stage = "mutate", error = %e, "stage failed");
        }
    });
    accepted("mutate")
}

async fn release(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> impl IntoResponse {
    let releaser = state.releaser.clone();
    tokio::spawn(async move {
        if let Err(e) = releaser.release(envelope).await {
            error!(stage = "release", error = %e, "stage failed");
        }
    });
    accepted("release")
}

async fn update(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> impl IntoResponse {
    let persister = state.persister.clone();
    tokio::spawn(async move {
        if let Err(e) = persister.update(envelope).await {
            error!(stage = "update", error = %e, "stage failed");
        }
    });
    accepted("update")
}

async fn trigger(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> impl IntoResponse {
    let activator = state.activator.clone();
    tokio::spawn(async move {
        if let Err(e) = activator.trigger(envelope).await {
            error!(stage = "trigger", error = %e, "stage failed");
        }
    });
    accepted("trigger")
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordingPublisher, RecordingStageClient};
    use crate::domain::config::{DetectionConfig, ResolutionConfig};
    use crate::domain::AbilityTable;
    use crate::infrastructure::repositories::InMemoryTrajectoryRepository;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let stages = Arc::new(RecordingStageClient::default());
        let repo = Arc::new(InMemoryTrajectoryRepository::new());
        let state = AppState {
            detector: Arc::new(DetectorService::new(DetectionConfig::default(), stages.clone())),
            resolver: Arc::new(ResolverService::new(
                Arc::new(AbilityTable::default()),
                ResolutionConfig::default(),
                DetectionConfig::default(),
                stages.clone(),
            )),
            releaser: Arc::new(ReleaserService::new(
                Arc::new(RecordingPublisher::default()),
                stages.clone(),
            )),
            persister: Arc::new(PersisterService::new(repo.clone(), stages.clone())),
            activator: Arc::new(ActivatorService::new(repo, stages, Duration::seconds(100))),
        };
        app(Arc::new(state))
    }

    #[tokio::test]
    async fn stages_acknowledge_with_202_before_business_completion() {
        for stage in ["detect", "mutate", "release", "update", "trigger"] {
            let request = Request::builder()
                .method("POST")
                .uri(format!("/{stage}"))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"data": [], "meta": {"origin": "self_report"}}"#))
                .unwrap();
            let response = test_app().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED, "stage {stage}");
        }
    }

    #[tokio::test]
    async fn malformed_envelope_is_rejected_at_the_boundary() {
        let request = Request::builder()
            .method("POST")
            .uri("/detect")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"data": [], "meta": {"origin": "nonsense"}}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn health_answers_ok() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
