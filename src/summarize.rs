//! Transcript summarization collaborator
//!
//! Mirrors the STT collaborator: the capability trait the HTTP layer
//! consumes, the wire messages, and a NATS request-reply client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Structured meeting summary produced by the summarization service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

/// Transcript summarization capability
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<Summary>;
}

/// Request published to the summarization service
#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub transcript: String,
}

/// Summarizer backed by a NATS request-reply service
pub struct NatsSummarizer {
    client: async_nats::Client,
    subject: String,
    timeout: Duration,
}

impl NatsSummarizer {
    pub fn new(client: async_nats::Client, subject: String, timeout: Duration) -> Self {
        Self {
            client,
            subject,
            timeout,
        }
    }
}

#[async_trait]
impl Summarizer for NatsSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<Summary> {
        info!("Requesting summary for {} characters", transcript.len());

        let request = SummarizeRequest {
            transcript: transcript.to_string(),
        };
        let payload = serde_json::to_vec(&request)?;

        let reply = tokio::time::timeout(
            self.timeout,
            self.client.request(self.subject.clone(), payload.into()),
        )
        .await
        .context("Summarization request timed out")?
        .context("Summarization request failed")?;

        let summary: Summary = serde_json::from_slice(&reply.payload)
            .context("Failed to parse summarization response")?;

        info!(
            "Summary received: {} key points, {} decisions, {} action items",
            summary.key_points.len(),
            summary.decisions.len(),
            summary.action_items.len()
        );

        Ok(summary)
    }
}
