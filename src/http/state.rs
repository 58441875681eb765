use crate::records::RecordStore;
use crate::recording::ChunkStore;
use crate::stt::Transcriber;
use crate::summarize::Summarizer;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// In-progress chunked recording sessions
    pub chunk_store: Arc<ChunkStore>,

    /// Finished transcript/summary records
    pub record_store: Arc<RecordStore>,

    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,

    pub service_name: String,

    /// Forwarded to the STT service with every transcription request
    pub preprocess_audio: bool,

    /// Default age threshold for the reclaim endpoint
    pub max_session_age_hours: u64,
}
