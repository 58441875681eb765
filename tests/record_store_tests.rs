// Integration tests for the saved transcript/summary record store

use anyhow::Result;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use voxnotes::{RecordPatch, RecordStore, Summary};

fn sample_summary() -> Summary {
    Summary {
        key_points: vec!["Budget approved".to_string(), "Launch moved up".to_string()],
        decisions: vec!["Ship in March".to_string()],
        action_items: vec!["Alex to draft announcement".to_string()],
    }
}

#[test]
fn test_create_and_get_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let id = store.create("full transcript text", sample_summary(), Some("Standup".to_string()))?;

    let record = store.get(&id)?.expect("record should exist");
    assert_eq!(record.id, id);
    assert_eq!(record.title, "Standup");
    assert_eq!(record.transcript, "full transcript text");
    assert_eq!(record.summary.key_points.len(), 2);
    assert_eq!(record.created_at, record.updated_at);

    Ok(())
}

#[test]
fn test_create_without_title_generates_one() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let id = store.create("text", Summary::default(), None)?;

    let record = store.get(&id)?.expect("record should exist");
    assert!(record.title.starts_with("Meeting "));

    Ok(())
}

#[test]
fn test_get_with_unknown_or_malformed_id_is_absent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let unknown = uuid::Uuid::new_v4().to_string();
    assert!(store.get(&unknown)?.is_none());

    // Malformed ids never reach the filesystem
    assert!(store.get("../../etc/passwd")?.is_none());
    assert!(store.get("not-a-uuid")?.is_none());

    Ok(())
}

#[test]
fn test_update_patches_only_provided_fields() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let id = store.create("original", sample_summary(), Some("Before".to_string()))?;

    thread::sleep(Duration::from_millis(5));
    let updated = store.update(
        &id,
        RecordPatch {
            title: Some("After".to_string()),
            ..Default::default()
        },
    )?;
    assert!(updated);

    let record = store.get(&id)?.expect("record should exist");
    assert_eq!(record.title, "After");
    assert_eq!(record.transcript, "original");
    assert_eq!(record.summary.decisions.len(), 1);
    assert!(record.updated_at > record.created_at);

    Ok(())
}

#[test]
fn test_update_missing_record_returns_false() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let unknown = uuid::Uuid::new_v4().to_string();
    assert!(!store.update(&unknown, RecordPatch::default())?);

    Ok(())
}

#[test]
fn test_delete_removes_record_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let id = store.create("text", Summary::default(), None)?;

    assert!(store.delete(&id)?);
    assert!(store.get(&id)?.is_none());
    assert!(!store.delete(&id)?);

    Ok(())
}

#[test]
fn test_list_is_newest_first_with_previews() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let long_transcript = "word ".repeat(100);
    let first = store.create(&long_transcript, Summary::default(), Some("First".to_string()))?;
    thread::sleep(Duration::from_millis(5));
    let second = store.create("short", Summary::default(), Some("Second".to_string()))?;

    let listing = store.list()?;
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].id, second);
    assert_eq!(listing[1].id, first);

    assert_eq!(listing[0].preview, "short");
    assert!(listing[1].preview.ends_with("..."));
    assert!(listing[1].preview.len() < long_transcript.len());

    Ok(())
}

#[test]
fn test_export_markdown_renders_all_sections() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let id = store.create("what was said", sample_summary(), Some("Planning".to_string()))?;

    let markdown = store.export_markdown(&id)?.expect("record should exist");
    assert!(markdown.starts_with("# Planning"));
    assert!(markdown.contains("## Transcript"));
    assert!(markdown.contains("what was said"));
    assert!(markdown.contains("### Key Points"));
    assert!(markdown.contains("1. Budget approved"));
    assert!(markdown.contains("### Decisions Made"));
    assert!(markdown.contains("### Action Items"));

    Ok(())
}

#[test]
fn test_export_markdown_skips_empty_sections() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RecordStore::new(temp_dir.path())?;

    let summary = Summary {
        key_points: vec!["Only point".to_string()],
        decisions: vec![],
        action_items: vec![],
    };
    let id = store.create("text", summary, None)?;

    let markdown = store.export_markdown(&id)?.expect("record should exist");
    assert!(markdown.contains("### Key Points"));
    assert!(!markdown.contains("### Decisions Made"));
    assert!(!markdown.contains("### Action Items"));

    Ok(())
}
