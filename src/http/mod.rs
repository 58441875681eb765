//! HTTP API server for the web frontend
//!
//! This module provides the REST API over the chunked recording store, the
//! transcription/summarization collaborators, and the saved-record store:
//! - POST /api/recording/initialize - Start a chunked upload session
//! - POST /api/recording/chunk/:id/:index - Upload one chunk (raw body)
//! - POST /api/recording/finalize/:id - Combine, transcribe, clean up
//! - GET /api/recording/status/:id - Query upload progress
//! - GET /api/recording/sessions - List all in-progress sessions
//! - POST /api/recording/reclaim - Sweep abandoned sessions
//! - POST /api/transcribe - Transcribe a one-shot upload
//! - POST /api/summarize - Summarize a transcript
//! - /api/sessions... - CRUD + Markdown export for saved records

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
