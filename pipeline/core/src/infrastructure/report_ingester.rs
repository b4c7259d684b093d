// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! Report Ingester
//!
//! Bridge from the raw report topic into the pipeline: subscribes to the
//! externally-sourced trajectory reports, wraps each single-UAV report in an
//! envelope stamped `origin = self_report`, and posts it to the Update stage.
//! Malformed payloads are logged and dropped — the broker's redelivery is
//! the only retry mechanism.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::dispatch::StageClient;
use crate::domain::config::MqttConfig;
use crate::domain::envelope::{Envelope, Meta};
use crate::domain::trajectory::{Origin, Trajectory};

pub struct ReportIngester {
    stages: Arc<dyn StageClient>,
}

impl ReportIngester {
    pub fn new(stages: Arc<dyn StageClient>) -> Self {
        Self { stages }
    }

    /// Subscribe and pump reports until the task is dropped.
    pub async fn run(&self, config: &MqttConfig) -> Result<()> {
        let client_id = format!("veer-ingester-{}", Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(std::time::Duration::from_secs(30));

        let (client, mut event_loop) = AsyncClient::new(options, 16);
        client
            .subscribe(&config.report_topic, QoS::AtLeastOnce)
            .await
            .with_context(|| format!("failed to subscribe to `{}`", config.report_topic))?;
        info!(topic = %config.report_topic, "report ingester subscribed");

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    self.handle_report(&publish.payload).await;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "mqtt event loop error, reconnecting");
                    tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                }
            }
        }
    }

    async fn handle_report(&self, payload: &[u8]) {
        let report: Trajectory = match serde_json::from_slice(payload) {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "bad JSON on report topic, dropping");
                return;
            }
        };

        let mut meta = Meta::new(Origin::SelfReport);
        meta.ingest_timestamp = Some(Utc::now().to_rfc3339());
        let envelope = Envelope::new(vec![report], meta);

        if let Err(e) = self.stages.post_update(&envelope).await {
            error!(error = %e, "failed to forward report to update stage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{RecordedCall, RecordingStageClient};

    #[tokio::test]
    async fn wraps_a_raw_report_and_forwards_to_update() {
        let stages = Arc::new(RecordingStageClient::default());
        let ingester = ReportIngester::new(stages.clone());

        let raw = br#"{
            "uav_id": "uav-9", "uav_type": "quad",
            "latitude": 1.0, "longitude": 2.0, "altitude": 800.0,
            "speed": 55.0, "direction": 270.0, "vertical_speed": 0.5
        }"#;
        ingester.handle_report(raw).await;

        match stages.calls().await.as_slice() {
            [RecordedCall::Update(env)] => {
                assert_eq!(env.meta.origin, Origin::SelfReport);
                assert!(env.meta.ingest_timestamp.is_some());
                assert_eq!(env.data[0].uav_id.as_str(), "uav-9");
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped() {
        let stages = Arc::new(RecordingStageClient::default());
        ReportIngester::new(stages.clone()).handle_report(b"not json").await;
        assert!(stages.calls().await.is_empty());
    }
}
