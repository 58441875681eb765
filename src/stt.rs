//! Speech-to-text collaborator
//!
//! Transcription runs out of process. This module defines the capability the
//! HTTP layer consumes plus a client that forwards media to the STT service
//! over NATS request-reply, with the audio bytes base64-encoded in the JSON
//! payload.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Speech-to-text capability.
///
/// Transcription may fail; callers are expected to keep the combined
/// recording on disk so a failed attempt can be retried.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media_path: &Path, preprocess: bool) -> Result<String>;
}

/// Request published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeRequest {
    /// Base64-encoded media bytes
    pub audio: String,
    pub mime_type: String,
    /// Whether the service should run its audio preprocessing pass first
    pub preprocess: bool,
}

/// Reply from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Transcriber backed by a NATS request-reply service
pub struct NatsTranscriber {
    client: async_nats::Client,
    subject: String,
    timeout: Duration,
}

impl NatsTranscriber {
    pub fn new(client: async_nats::Client, subject: String, timeout: Duration) -> Self {
        Self {
            client,
            subject,
            timeout,
        }
    }
}

#[async_trait]
impl Transcriber for NatsTranscriber {
    async fn transcribe(&self, media_path: &Path, preprocess: bool) -> Result<String> {
        let media = tokio::fs::read(media_path)
            .await
            .with_context(|| format!("Failed to read media file: {}", media_path.display()))?;

        info!(
            "Requesting transcription for {} ({} bytes)",
            media_path.display(),
            media.len()
        );

        let request = TranscribeRequest {
            audio: base64::engine::general_purpose::STANDARD.encode(&media),
            mime_type: mime_for_path(media_path).to_string(),
            preprocess,
        };
        let payload = serde_json::to_vec(&request)?;

        let reply = tokio::time::timeout(
            self.timeout,
            self.client.request(self.subject.clone(), payload.into()),
        )
        .await
        .context("Transcription request timed out")?
        .context("Transcription request failed")?;

        let response: TranscribeResponse = serde_json::from_slice(&reply.payload)
            .context("Failed to parse transcription response")?;

        info!("Transcription complete: {} characters", response.text.len());

        Ok(response.text)
    }
}

/// Best-effort MIME type from the file extension, for the STT service's
/// decoder selection
fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        _ => "audio/webm",
    }
}
