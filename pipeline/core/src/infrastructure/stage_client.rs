// Copyright (c) 2026 Veer Robotics
// SPDX-License-Identifier: AGPL-3.0

//! HTTP Stage Client
//!
//! Fire-and-forget reqwest transport between stages. Every hop POSTs the
//! JSON envelope with the async-invoke header and expects an immediate
//! `202 Accepted`; any other status is a collaborator failure surfaced to
//! the caller, who logs it and moves on. A bounded timeout keeps a hung
//! stage from blocking its caller indefinitely.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::application::dispatch::StageClient;
use crate::domain::config::StageEndpoints;
use crate::domain::envelope::Envelope;

/// Header marking the request as an asynchronous stage invocation.
pub const ASYNC_INVOKE_HEADER: &str = "X-Veer-Async";

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpStageClient {
    client: Client,
    endpoints: StageEndpoints,
}

impl HttpStageClient {
    pub fn new(endpoints: StageEndpoints) -> Self {
        let client = Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, endpoints }
    }

    async fn post(&self, url: &str, envelope: &Envelope) -> Result<()> {
        debug!(url, batch = envelope.data.len(), "calling next stage");
        let response = self
            .client
            .post(url)
            .header(ASYNC_INVOKE_HEADER, "true")
            .json(envelope)
            .send()
            .await
            .with_context(|| format!("failed to reach stage at {url}"))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("stage at {url} answered {status}: {body}"));
        }
        Ok(())
    }
}

#[async_trait]
impl StageClient for HttpStageClient {
    async fn post_detect(&self, envelope: &Envelope) -> Result<()> {
        self.post(&self.endpoints.detect, envelope).await
    }
    async fn post_mutate(&self, envelope: &Envelope) -> Result<()> {
        self.post(&self.endpoints.mutate, envelope).await
    }
    async fn post_release(&self, envelope: &Envelope) -> Result<()> {
        self.post(&self.endpoints.release, envelope).await
    }
    async fn post_update(&self, envelope: &Envelope) -> Result<()> {
        self.post(&self.endpoints.update, envelope).await
    }
    async fn post_trigger(&self, envelope: &Envelope) -> Result<()> {
        self.post(&self.endpoints.trigger, envelope).await
    }
}
