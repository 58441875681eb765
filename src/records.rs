//! Durable store for finished transcript/summary records
//!
//! Entirely separate from the chunk store: a record is created only after a
//! recording has been combined, transcribed, and its session directory
//! cleaned up. One JSON file per record under a dedicated root.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::summarize::Summary;

/// Characters of transcript included in listing previews
const PREVIEW_CHARS: usize = 200;

/// A finished meeting record: transcript plus structured summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transcript: String,
    #[serde(default)]
    pub summary: Summary,
}

/// Listing entry: everything but the full transcript
#[derive(Debug, Clone, Serialize)]
pub struct RecordPreview {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub preview: String,
}

/// Fields a caller may change on an existing record; `None` leaves the
/// current value in place
#[derive(Debug, Default)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<Summary>,
}

pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create record store root: {}", root.display()))?;

        info!("Record store ready at {}", root.display());

        Ok(Self { root })
    }

    /// Persist a new record and return its generated id.
    pub fn create(
        &self,
        transcript: &str,
        summary: Summary,
        title: Option<String>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let record = SessionRecord {
            id: id.clone(),
            title: title.unwrap_or_else(|| format!("Meeting {}", now.format("%Y-%m-%d %H:%M"))),
            created_at: now,
            updated_at: now,
            transcript: transcript.to_string(),
            summary,
        };

        self.write_record(&record)?;
        info!("Saved session record: {}", id);

        Ok(id)
    }

    /// Fetch a record by id. Unknown and malformed ids both read as absent.
    pub fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }

        let contents = fs::read(&path)
            .with_context(|| format!("Failed to read record: {}", path.display()))?;
        let record = serde_json::from_slice(&contents)
            .with_context(|| format!("Record is unreadable: {}", path.display()))?;

        Ok(Some(record))
    }

    /// Apply a patch to an existing record. Returns false if the record does
    /// not exist.
    pub fn update(&self, id: &str, patch: RecordPatch) -> Result<bool> {
        let Some(mut record) = self.get(id)? else {
            return Ok(false);
        };

        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(transcript) = patch.transcript {
            record.transcript = transcript;
        }
        if let Some(summary) = patch.summary {
            record.summary = summary;
        }
        record.updated_at = Utc::now();

        self.write_record(&record)?;
        info!("Updated session record: {}", id);

        Ok(true)
    }

    /// Delete a record. Returns false if it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(path) = self.record_path(id) else {
            return Ok(false);
        };
        if !path.is_file() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete record: {}", path.display()))?;
        info!("Deleted session record: {}", id);

        Ok(true)
    }

    /// All records as previews, most recent first. Unreadable files are
    /// skipped with a warning so one corrupt record cannot hide the rest.
    pub fn list(&self) -> Result<Vec<RecordPreview>> {
        let mut previews = Vec::new();

        for entry in fs::read_dir(&self.root).context("Failed to list record store")? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let contents = match fs::read(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", path.display(), e);
                    continue;
                }
            };
            let record: SessionRecord = match serde_json::from_slice(&contents) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", path.display(), e);
                    continue;
                }
            };

            previews.push(RecordPreview {
                preview: preview_of(&record.transcript),
                id: record.id,
                title: record.title,
                created_at: record.created_at,
                updated_at: record.updated_at,
            });
        }

        previews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(previews)
    }

    /// Render a record as a standalone Markdown document.
    pub fn export_markdown(&self, id: &str) -> Result<Option<String>> {
        let Some(record) = self.get(id)? else {
            return Ok(None);
        };

        let mut markdown = format!(
            "# {}\n\n**Date:** {}\n\n---\n\n## Transcript\n\n{}\n\n---\n\n## Summary\n\n### Key Points\n\n",
            record.title,
            record.created_at.format("%B %d, %Y at %I:%M %p"),
            record.transcript
        );

        for (i, point) in record.summary.key_points.iter().enumerate() {
            markdown.push_str(&format!("{}. {}\n", i + 1, point));
        }

        if !record.summary.decisions.is_empty() {
            markdown.push_str("\n### Decisions Made\n\n");
            for (i, decision) in record.summary.decisions.iter().enumerate() {
                markdown.push_str(&format!("{}. {}\n", i + 1, decision));
            }
        }

        if !record.summary.action_items.is_empty() {
            markdown.push_str("\n### Action Items\n\n");
            for (i, item) in record.summary.action_items.iter().enumerate() {
                markdown.push_str(&format!("{}. {}\n", i + 1, item));
            }
        }

        markdown.push_str("\n---\n\n*Generated by voxnotes*\n");

        Ok(Some(markdown))
    }

    /// Record ids are server-generated UUIDs; anything that does not parse as
    /// one cannot name a record file and is treated as absent. This also
    /// keeps caller-supplied ids from ever reaching the filesystem verbatim.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let uuid = Uuid::parse_str(id).ok()?;
        Some(self.root.join(format!("{}.json", uuid)))
    }

    fn write_record(&self, record: &SessionRecord) -> Result<()> {
        let path = self.root.join(format!("{}.json", record.id));
        let contents = serde_json::to_vec_pretty(record)?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write record: {}", path.display()))?;
        Ok(())
    }
}

fn preview_of(transcript: &str) -> String {
    let mut chars = transcript.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &transcript[..cut]),
        None => transcript.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_transcripts() {
        let short = "hello world";
        assert_eq!(preview_of(short), short);

        let long = "x".repeat(500);
        let preview = preview_of(&long);
        assert_eq!(preview.len(), PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let long = "ü".repeat(300);
        let preview = preview_of(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
    }
}
