// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! MQTT Release Publisher
//!
//! Publishes released trajectory batches on the shared topic with QoS 1
//! (at-least-once). Consumers — simulated aircraft and visualizers — must
//! tolerate duplicate delivery.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::dispatch::ReleasePublisher;
use crate::domain::config::MqttConfig;
use crate::domain::trajectory::Trajectory;

pub struct MqttReleasePublisher {
    client: AsyncClient,
    topic: String,
}

impl MqttReleasePublisher {
    /// Connect to the broker and drive the event loop on a background task.
    pub fn connect(config: &MqttConfig) -> Self {
        let client_id = format!("veer-release-{}", Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(std::time::Duration::from_secs(30));

        let (client, mut event_loop) = AsyncClient::new(options, 16);
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(packet)) => debug!(?packet, "mqtt incoming"),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mqtt event loop error, reconnecting");
                        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                    }
                }
            }
        });

        Self { client, topic: config.release_topic.clone() }
    }
}

#[async_trait]
impl ReleasePublisher for MqttReleasePublisher {
    async fn publish(&self, batch: &[Trajectory]) -> Result<()> {
        let payload = serde_json::to_vec(batch).context("failed to encode release batch")?;
        self.client
            .publish(&self.topic, QoS::AtLeastOnce, false, payload)
            .await
            .with_context(|| format!("failed to publish to topic `{}`", self.topic))?;
        debug!(topic = %self.topic, batch = batch.len(), "published release batch");
        Ok(())
    }
}
