pub mod config;
pub mod error;
pub mod http;
pub mod records;
pub mod recording;
pub mod stt;
pub mod summarize;

pub use config::Config;
pub use error::{StorageError, StorageResult};
pub use http::{create_router, AppState};
pub use records::{RecordPatch, RecordPreview, RecordStore, SessionRecord};
pub use recording::{ChunkReceipt, ChunkStore, CombineSummary, SessionMetadata};
pub use stt::{NatsTranscriber, Transcriber};
pub use summarize::{NatsSummarizer, Summarizer, Summary};
