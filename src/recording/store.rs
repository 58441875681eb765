use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as SessionMutex;
use tracing::{info, warn};

use super::metadata::SessionMetadata;
use crate::error::{StorageError, StorageResult};

/// Session ids become path segments under the storage root, so keep them short
const MAX_SESSION_ID_LEN: usize = 128;

/// Progress report returned by `save_chunk` so the caller can answer the
/// upload request without a second metadata lookup
#[derive(Debug, Clone, Serialize)]
pub struct ChunkReceipt {
    pub chunk_index: u32,
    pub size: u64,
    pub total_chunks: u64,
    pub total_size: u64,
}

/// Result of combining a session's chunks into one output stream
#[derive(Debug, Clone, Serialize)]
pub struct CombineSummary {
    pub chunks_combined: usize,
    pub total_size: u64,
    pub output_file: PathBuf,
}

/// On-disk store for chunked recording sessions.
///
/// Long recordings arrive as many small uploads; each session owns one
/// directory under the storage root holding a `metadata.json` record plus one
/// file per chunk. The filesystem is the single source of truth: every
/// operation re-derives state from disk, so the store is safe to share across
/// request handlers and survives process restarts.
///
/// Chunk filenames zero-pad the index to six digits so lexicographic listing
/// order equals numeric order; a session can therefore hold at most 1,000,000
/// chunks.
///
/// Metadata updates are read-modify-write of the whole record, so every
/// operation takes a per-session async lock for its full filesystem sequence.
/// Operations on different sessions never contend.
pub struct ChunkStore {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<SessionMutex<()>>>>,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        info!("Chunk store ready at {}", root.display());

        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the session directory and a fresh metadata record.
    ///
    /// Idempotent: re-initializing an existing session rewrites its metadata
    /// but does not delete already-written chunk files, which become orphaned
    /// relative to the new record.
    pub async fn initialize(&self, session_id: &str, mime_type: &str) -> StorageResult<()> {
        let dir = self.session_dir(session_id)?;
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        fs::create_dir_all(&dir)?;
        let metadata = SessionMetadata::new(session_id.to_string(), mime_type.to_string());
        metadata.store(&dir)?;

        info!("Initialized recording session: {}", session_id);

        Ok(())
    }

    /// Persist one chunk and update the session's progress counters.
    ///
    /// Writing the same index again overwrites the chunk file (last write
    /// wins), which makes client-side upload retries safe. The payload length
    /// is added to `total_size` unconditionally, so a rewrite counts twice.
    pub async fn save_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        payload: &[u8],
    ) -> StorageResult<ChunkReceipt> {
        if payload.is_empty() {
            return Err(StorageError::EmptyPayload);
        }

        let dir = self.session_dir(session_id)?;
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        if !dir.is_dir() {
            return Err(StorageError::SessionNotFound(session_id.to_string()));
        }

        let mut metadata = SessionMetadata::load(&dir)?;

        let chunk_file = dir.join(chunk_filename(chunk_index, &metadata.mime_type));
        fs::write(&chunk_file, payload)?;

        metadata.chunks_received = metadata.chunks_received.max(u64::from(chunk_index) + 1);
        metadata.total_size += payload.len() as u64;
        metadata.last_updated = Some(chrono::Utc::now());
        metadata.store(&dir)?;

        info!(
            "Saved chunk {} ({} bytes) for session {}",
            chunk_index,
            payload.len(),
            session_id
        );

        Ok(ChunkReceipt {
            chunk_index,
            size: payload.len() as u64,
            total_chunks: metadata.chunks_received,
            total_size: metadata.total_size,
        })
    }

    /// Read the session's metadata record.
    pub async fn status(&self, session_id: &str) -> StorageResult<SessionMetadata> {
        let dir = self.session_dir(session_id)?;
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        SessionMetadata::load(&dir)
    }

    /// Concatenate all persisted chunks, in ascending index order, into
    /// `output_path`, then mark the session finalized.
    ///
    /// No transformation or boundary validation is performed: this relies on
    /// the recording container tolerating byte-level concatenation of
    /// sequentially produced segments, which holds for WebM streams from a
    /// single MediaRecorder but not for arbitrary audio containers.
    ///
    /// If writing the output fails mid-stream, the chunk files and metadata
    /// are left untouched; the partial output is invalid and the whole
    /// operation can simply be retried.
    pub async fn combine(
        &self,
        session_id: &str,
        output_path: &Path,
    ) -> StorageResult<CombineSummary> {
        let dir = self.session_dir(session_id)?;
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        if !dir.is_dir() {
            return Err(StorageError::SessionNotFound(session_id.to_string()));
        }

        let mut metadata = SessionMetadata::load(&dir)?;

        let chunks = chunk_files(&dir)?;
        if chunks.is_empty() {
            return Err(StorageError::NoChunksAvailable(session_id.to_string()));
        }

        let mut total_size = 0u64;
        let mut output = BufWriter::new(File::create(output_path)?);
        for chunk_file in &chunks {
            let mut reader = File::open(chunk_file)?;
            total_size += std::io::copy(&mut reader, &mut output)?;
        }
        output.flush()?;

        metadata.finalized = true;
        metadata.finalized_at = Some(chrono::Utc::now());
        metadata.output_file = Some(output_path.display().to_string());
        metadata.store(&dir)?;

        info!(
            "Combined {} chunks into {} ({} bytes) for session {}",
            chunks.len(),
            output_path.display(),
            total_size,
            session_id
        );

        Ok(CombineSummary {
            chunks_combined: chunks.len(),
            total_size,
            output_file: output_path.to_path_buf(),
        })
    }

    /// Default combined-output location, inside the session directory.
    ///
    /// Keeping the combined stream next to its chunks means a failed
    /// downstream step (transcription) leaves everything in place for a
    /// retried finalize; `cleanup` removes it along with the rest.
    pub async fn default_output_path(&self, session_id: &str) -> StorageResult<PathBuf> {
        let dir = self.session_dir(session_id)?;
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let metadata = SessionMetadata::load(&dir)?;
        Ok(dir.join(format!("combined.{}", extension_for_mime(&metadata.mime_type))))
    }

    /// Remove the session directory and everything in it.
    ///
    /// Idempotent: a session that is already gone is not an error.
    pub async fn cleanup(&self, session_id: &str) -> StorageResult<()> {
        let dir = self.session_dir(session_id)?;
        let lock = self.session_lock(session_id);
        let guard = lock.lock().await;

        let removed = if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
            true
        } else {
            false
        };

        drop(guard);
        drop(lock);
        self.discard_idle_lock(session_id);

        if removed {
            info!("Cleaned up session: {}", session_id);
        }

        Ok(())
    }

    /// Delete every unfinalized session older than `max_age_hours` and return
    /// how many were removed.
    ///
    /// Finalized sessions are never reclaimed regardless of age: they are
    /// awaiting an explicit cleanup call once the combined stream has been
    /// consumed downstream. Each candidate's session lock is taken before
    /// deletion so the sweep cannot race an in-flight chunk write or combine.
    /// Directories without a readable metadata record are skipped.
    pub async fn reclaim_stale(&self, max_age_hours: u64) -> StorageResult<usize> {
        let now = chrono::Utc::now();
        let mut reclaimed = 0;

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(session_id) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let lock = self.session_lock(&session_id);
            let guard = lock.lock().await;

            match SessionMetadata::load(&path) {
                Ok(metadata) if !metadata.finalized => {
                    let age_hours = now.signed_duration_since(metadata.created_at).num_milliseconds()
                        as f64
                        / 3_600_000.0;
                    if age_hours > max_age_hours as f64 {
                        fs::remove_dir_all(&path)?;
                        reclaimed += 1;
                        info!("Reclaimed stale session: {} ({:.1}h old)", session_id, age_hours);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping {} during reclaim sweep: {}", path.display(), e);
                }
            }

            drop(guard);
            drop(lock);
            self.discard_idle_lock(&session_id);
        }

        Ok(reclaimed)
    }

    /// Raw metadata for every session under the root, for operational
    /// inspection. No filtering, no pagination; unreadable directories are
    /// skipped with a warning.
    pub async fn list_sessions(&self) -> StorageResult<Vec<SessionMetadata>> {
        let mut sessions = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(session_id) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                continue;
            };

            let lock = self.session_lock(&session_id);
            let _guard = lock.lock().await;

            match SessionMetadata::load(&path) {
                Ok(metadata) => sessions.push(metadata),
                Err(e) => warn!("Skipping unreadable session {}: {}", path.display(), e),
            }
        }

        Ok(sessions)
    }

    fn session_dir(&self, session_id: &str) -> StorageResult<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.root.join(session_id))
    }

    fn session_lock(&self, session_id: &str) -> Arc<SessionMutex<()>> {
        let mut locks = self.locks.lock().expect("session lock map poisoned");
        locks.entry(session_id.to_string()).or_default().clone()
    }

    /// Drop a lock map entry once no operation holds or awaits it. Entries
    /// for live sessions stay put; this only trims ids whose directories have
    /// been deleted.
    fn discard_idle_lock(&self, session_id: &str) {
        let mut locks = self.locks.lock().expect("session lock map poisoned");
        if let Some(lock) = locks.get(session_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(session_id);
            }
        }
    }
}

/// A session id is used verbatim as a path segment under the storage root, so
/// anything that could escape the root is rejected outright, never sanitized.
fn validate_session_id(session_id: &str) -> StorageResult<()> {
    let well_formed = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id != "."
        && session_id != ".."
        && session_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.');

    if well_formed {
        Ok(())
    } else {
        Err(StorageError::InvalidSessionId(session_id.to_string()))
    }
}

fn chunk_filename(chunk_index: u32, mime_type: &str) -> String {
    format!("chunk_{:06}.{}", chunk_index, extension_for_mime(mime_type))
}

/// All chunk files in a session directory, sorted by name. The fixed-width
/// index padding makes name order equal index order.
fn chunk_files(dir: &Path) -> StorageResult<Vec<PathBuf>> {
    let mut chunks = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with("chunk_") {
            chunks.push(entry.path());
        }
    }

    chunks.sort();
    Ok(chunks)
}

/// Map a recording MIME type to a chunk file extension. Advisory only, like
/// the MIME type itself; unknown types fall back to webm.
fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        _ => "webm",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_validation() {
        assert!(validate_session_id("recording-2025-01-07_a1b2").is_ok());
        assert!(validate_session_id("x").is_ok());

        assert!(validate_session_id("").is_err());
        assert!(validate_session_id(".").is_err());
        assert!(validate_session_id("..").is_err());
        assert!(validate_session_id("../escape").is_err());
        assert!(validate_session_id("a/b").is_err());
        assert!(validate_session_id("a\\b").is_err());
        assert!(validate_session_id("null\0byte").is_err());
        assert!(validate_session_id(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_chunk_filename_padding() {
        assert_eq!(chunk_filename(0, "audio/webm"), "chunk_000000.webm");
        assert_eq!(chunk_filename(42, "audio/ogg"), "chunk_000042.ogg");
        assert_eq!(chunk_filename(999_999, "audio/webm"), "chunk_999999.webm");
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_for_mime("audio/webm"), "webm");
        assert_eq!(extension_for_mime("video/x-matroska"), "webm");
        assert_eq!(extension_for_mime("audio/mpeg"), "mp3");
    }
}
