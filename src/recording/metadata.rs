use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{StorageError, StorageResult};

pub const METADATA_FILENAME: &str = "metadata.json";

/// Durable per-session descriptor tracking upload progress and lifecycle state.
///
/// Persisted as `metadata.json` inside the session directory; the whole record
/// is rewritten on every accepted chunk. The directory existing is equivalent
/// to "session initialized".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,

    /// Advisory MIME type recorded at initialization; never validated against
    /// the chunk payloads
    pub mime_type: String,

    /// Set once at initialization, immutable afterwards
    pub created_at: DateTime<Utc>,

    /// One plus the highest chunk index ever accepted. Not a count of distinct
    /// chunks: gaps and out-of-order arrival leave it at the maximum
    pub chunks_received: u64,

    /// Cumulative bytes across all accepted chunk writes; rewriting an index
    /// counts its payload again
    pub total_size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    /// False until the chunks have been combined into one output stream
    pub finalized: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

impl SessionMetadata {
    pub fn new(session_id: String, mime_type: String) -> Self {
        Self {
            session_id,
            mime_type,
            created_at: Utc::now(),
            chunks_received: 0,
            total_size: 0,
            last_updated: None,
            finalized: false,
            finalized_at: None,
            output_file: None,
        }
    }

    /// Load the metadata record from a session directory.
    ///
    /// A missing record means the session was never initialized (or has been
    /// cleaned up) and surfaces as `SessionNotFound`.
    pub fn load(session_dir: &Path) -> StorageResult<Self> {
        let path = session_dir.join(METADATA_FILENAME);
        if !path.is_file() {
            let session_id = session_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(StorageError::SessionNotFound(session_id));
        }

        let contents = fs::read(&path)?;
        Ok(serde_json::from_slice(&contents)?)
    }

    /// Replace the stored record wholesale (not a partial patch).
    pub fn store(&self, session_dir: &Path) -> StorageResult<()> {
        let path = session_dir.join(METADATA_FILENAME);
        let contents = serde_json::to_vec_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
