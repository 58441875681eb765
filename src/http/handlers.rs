use super::state::AppState;
use crate::error::StorageError;
use crate::records::{RecordPatch, RecordPreview, SessionRecord};
use crate::recording::{ChunkReceipt, SessionMetadata};
use crate::summarize::Summary;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct InitializeRecordingRequest {
    pub session_id: String,

    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "audio/webm".to_string()
}

#[derive(Debug, Serialize)]
pub struct InitializeRecordingResponse {
    pub session_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadChunkResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub receipt: ChunkReceipt,
}

#[derive(Debug, Serialize)]
pub struct FinalizeRecordingResponse {
    pub transcript: String,
    pub chunks_combined: usize,
    pub total_size: u64,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RecordingStatusResponse {
    pub session_id: String,
    pub chunks_received: u64,
    pub total_size: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub finalized: bool,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RecordingSessionsResponse {
    pub sessions: Vec<SessionMetadata>,
    pub count: usize,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ReclaimParams {
    pub max_age_hours: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReclaimResponse {
    pub reclaimed: usize,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    /// File extension of the uploaded audio (webm, wav, mp3, m4a, ogg)
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeUploadResponse {
    pub transcript: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeTranscriptRequest {
    pub transcript: String,

    /// Persist the transcript and summary as a session record
    #[serde(default = "default_true")]
    pub save_session: bool,

    pub title: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct SummarizeTranscriptResponse {
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SaveRecordRequest {
    pub transcript: String,
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
pub struct SaveRecordResponse {
    pub session_id: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordRequest {
    pub title: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
pub struct ListRecordsResponse {
    pub sessions: Vec<RecordPreview>,
    pub count: usize,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GetRecordResponse {
    pub session: SessionRecord,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Map storage errors onto HTTP statuses. Caller-recoverable conditions are
/// surfaced as 404/400 so the frontend can react; everything else is an
/// opaque 500 carrying the diagnostic detail.
fn storage_error(context: &str, err: StorageError) -> Response {
    match err {
        StorageError::SessionNotFound(_) | StorageError::NoChunksAvailable(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: err.to_string(),
                detail: None,
            }),
        )
            .into_response(),
        StorageError::EmptyPayload | StorageError::InvalidSessionId(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: err.to_string(),
                detail: None,
            }),
        )
            .into_response(),
        other => {
            error!("{}: {}", context, other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: context.to_string(),
                    detail: Some(other.to_string()),
                }),
            )
                .into_response()
        }
    }
}

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!("{}: {:#}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: context.to_string(),
            detail: Some(format!("{:#}", err)),
        }),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            detail: None,
        }),
    )
        .into_response()
}

// ============================================================================
// Health
// ============================================================================

/// GET /
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/status
/// Service configuration snapshot
pub async fn service_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "audio_preprocessing": state.preprocess_audio,
        "max_session_age_hours": state.max_session_age_hours,
    }))
}

// ============================================================================
// Chunked recording lifecycle
// ============================================================================

/// POST /api/recording/initialize
/// Initialize a new recording session for progressive chunk uploads
pub async fn initialize_recording(
    State(state): State<AppState>,
    Json(req): Json<InitializeRecordingRequest>,
) -> impl IntoResponse {
    match state
        .chunk_store
        .initialize(&req.session_id, &req.mime_type)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(InitializeRecordingResponse {
                session_id: req.session_id,
                status: "initialized",
            }),
        )
            .into_response(),
        Err(e) => storage_error("Failed to initialize recording session", e),
    }
}

/// POST /api/recording/chunk/:session_id/:chunk_index
/// Upload a single audio chunk as the raw request body
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path((session_id, chunk_index)): Path<(String, u32)>,
    body: Bytes,
) -> impl IntoResponse {
    match state
        .chunk_store
        .save_chunk(&session_id, chunk_index, &body)
        .await
    {
        Ok(receipt) => (
            StatusCode::OK,
            Json(UploadChunkResponse {
                status: "success",
                receipt,
            }),
        )
            .into_response(),
        Err(e) => storage_error("Failed to save chunk", e),
    }
}

/// POST /api/recording/finalize/:session_id
/// Combine all chunks, transcribe the result, and clean up the session
pub async fn finalize_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let output = match state.chunk_store.default_output_path(&session_id).await {
        Ok(path) => path,
        Err(e) => return storage_error("Failed to finalize recording", e),
    };

    let combined = match state.chunk_store.combine(&session_id, &output).await {
        Ok(summary) => summary,
        Err(e) => return storage_error("Failed to finalize recording", e),
    };

    info!(
        "Finalized recording {}: {} chunks, {} bytes",
        session_id, combined.chunks_combined, combined.total_size
    );

    match state
        .transcriber
        .transcribe(&output, state.preprocess_audio)
        .await
    {
        Ok(transcript) => {
            // The combined stream has been consumed; the session directory is
            // no longer needed
            if let Err(e) = state.chunk_store.cleanup(&session_id).await {
                warn!("Could not clean up session {}: {}", session_id, e);
            }

            (
                StatusCode::OK,
                Json(FinalizeRecordingResponse {
                    transcript,
                    chunks_combined: combined.chunks_combined,
                    total_size: combined.total_size,
                    status: "success",
                }),
            )
                .into_response()
        }
        // Keep the session directory (combined stream included) so the
        // client can retry finalize
        Err(e) => internal_error("Failed to transcribe recording", e),
    }
}

/// GET /api/recording/status/:session_id
/// Get status of an ongoing recording session
pub async fn recording_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.chunk_store.status(&session_id).await {
        Ok(metadata) => (
            StatusCode::OK,
            Json(RecordingStatusResponse {
                session_id: metadata.session_id,
                chunks_received: metadata.chunks_received,
                total_size: metadata.total_size,
                created_at: metadata.created_at,
                finalized: metadata.finalized,
                status: "success",
            }),
        )
            .into_response(),
        Err(e) => storage_error("Failed to get session status", e),
    }
}

/// GET /api/recording/sessions
/// List raw metadata for every in-progress session
pub async fn list_recording_sessions(State(state): State<AppState>) -> impl IntoResponse {
    match state.chunk_store.list_sessions().await {
        Ok(sessions) => (
            StatusCode::OK,
            Json(RecordingSessionsResponse {
                count: sessions.len(),
                sessions,
                status: "success",
            }),
        )
            .into_response(),
        Err(e) => storage_error("Failed to list recording sessions", e),
    }
}

/// POST /api/recording/reclaim
/// Remove abandoned, unfinalized sessions past the age threshold
pub async fn reclaim_sessions(
    State(state): State<AppState>,
    Query(params): Query<ReclaimParams>,
) -> impl IntoResponse {
    let max_age_hours = params.max_age_hours.unwrap_or(state.max_session_age_hours);

    match state.chunk_store.reclaim_stale(max_age_hours).await {
        Ok(reclaimed) => (
            StatusCode::OK,
            Json(ReclaimResponse {
                reclaimed,
                status: "success",
            }),
        )
            .into_response(),
        Err(e) => storage_error("Failed to reclaim stale sessions", e),
    }
}

// ============================================================================
// Transcription and summarization
// ============================================================================

/// POST /api/transcribe
/// Transcribe a complete audio upload (raw request body)
pub async fn transcribe_upload(
    State(state): State<AppState>,
    Query(params): Query<TranscribeParams>,
    body: Bytes,
) -> impl IntoResponse {
    if body.is_empty() {
        return bad_request("No audio data provided");
    }

    let format = params.format.as_deref().unwrap_or("webm");
    if !matches!(format, "webm" | "wav" | "mp3" | "m4a" | "ogg") {
        return bad_request("Invalid file format. Supported: webm, wav, mp3, m4a, ogg");
    }

    let tmp_path = std::env::temp_dir().join(format!(
        "voxnotes-upload-{}.{}",
        uuid::Uuid::new_v4(),
        format
    ));

    if let Err(e) = tokio::fs::write(&tmp_path, &body).await {
        return internal_error("Failed to stage audio upload", e.into());
    }

    info!("Transcribing audio upload ({} bytes)", body.len());

    let result = state
        .transcriber
        .transcribe(&tmp_path, state.preprocess_audio)
        .await;

    if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
        warn!("Could not delete temp file {}: {}", tmp_path.display(), e);
    }

    match result {
        Ok(transcript) => (
            StatusCode::OK,
            Json(TranscribeUploadResponse {
                transcript,
                status: "success",
            }),
        )
            .into_response(),
        Err(e) => internal_error("Transcription failed. Please try recording again.", e),
    }
}

/// POST /api/summarize
/// Summarize a transcript into structured notes, optionally saving a record
pub async fn summarize_transcript(
    State(state): State<AppState>,
    Json(req): Json<SummarizeTranscriptRequest>,
) -> impl IntoResponse {
    if req.transcript.trim().is_empty() {
        return bad_request("No transcript provided");
    }

    info!("Summarizing transcript: {} characters", req.transcript.len());

    let summary = match state.summarizer.summarize(&req.transcript).await {
        Ok(summary) => summary,
        Err(e) => return internal_error("Failed to generate summary. Please try again.", e),
    };

    // Storage failure must not fail the summarization request
    let session_id = if req.save_session {
        match state
            .record_store
            .create(&req.transcript, summary.clone(), req.title)
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Failed to save session record: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    (
        StatusCode::OK,
        Json(SummarizeTranscriptResponse {
            summary,
            session_id,
            status: "success",
        }),
    )
        .into_response()
}

// ============================================================================
// Saved session records
// ============================================================================

/// POST /api/sessions
/// Save a session record directly, without summarization
pub async fn create_record(
    State(state): State<AppState>,
    Json(req): Json<SaveRecordRequest>,
) -> impl IntoResponse {
    if req.transcript.trim().is_empty() {
        return bad_request("No transcript provided");
    }

    match state
        .record_store
        .create(&req.transcript, req.summary, req.title)
    {
        Ok(session_id) => (
            StatusCode::OK,
            Json(SaveRecordResponse {
                session_id,
                status: "success",
            }),
        )
            .into_response(),
        Err(e) => internal_error("Failed to save session", e),
    }
}

/// GET /api/sessions
/// List all saved records, most recent first, with transcript previews
pub async fn list_records(State(state): State<AppState>) -> impl IntoResponse {
    match state.record_store.list() {
        Ok(sessions) => (
            StatusCode::OK,
            Json(ListRecordsResponse {
                count: sessions.len(),
                sessions,
                status: "success",
            }),
        )
            .into_response(),
        Err(e) => internal_error("Failed to load session history", e),
    }
}

/// GET /api/sessions/:record_id
/// Full record data including transcript and summary
pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> impl IntoResponse {
    match state.record_store.get(&record_id) {
        Ok(Some(session)) => (
            StatusCode::OK,
            Json(GetRecordResponse {
                session,
                status: "success",
            }),
        )
            .into_response(),
        Ok(None) => record_not_found(),
        Err(e) => internal_error("Failed to load session", e),
    }
}

/// PUT /api/sessions/:record_id
/// Update an existing record
pub async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Json(req): Json<UpdateRecordRequest>,
) -> impl IntoResponse {
    let patch = RecordPatch {
        title: req.title,
        transcript: req.transcript,
        summary: req.summary,
    };

    match state.record_store.update(&record_id, patch) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "success" })),
        )
            .into_response(),
        Ok(false) => record_not_found(),
        Err(e) => internal_error("Failed to update session", e),
    }
}

/// DELETE /api/sessions/:record_id
/// Delete a record by ID
pub async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> impl IntoResponse {
    match state.record_store.delete(&record_id) {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "Session deleted successfully",
                "status": "success",
            })),
        )
            .into_response(),
        Ok(false) => record_not_found(),
        Err(e) => internal_error("Failed to delete session", e),
    }
}

/// GET /api/sessions/:record_id/export
/// Export a record as a Markdown document
pub async fn export_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> impl IntoResponse {
    match state.record_store.export_markdown(&record_id) {
        Ok(Some(markdown)) => {
            let short_id: String = record_id.chars().take(8).collect();
            (
                [
                    (
                        header::CONTENT_TYPE,
                        "text/markdown; charset=utf-8".to_string(),
                    ),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=voxnotes-session-{}.md", short_id),
                    ),
                ],
                markdown,
            )
                .into_response()
        }
        Ok(None) => record_not_found(),
        Err(e) => internal_error("Failed to export session", e),
    }
}

fn record_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Session not found".to_string(),
            detail: None,
        }),
    )
        .into_response()
}
