//! Notes attached to reading pages, kept for all books in one JSON file.
//!
//! Every operation reads and rewrites the whole file. Storage failures are
//! logged and leave the caller with an empty list or an unchanged file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use tracing::warn;
use uuid::Uuid;

/// Leading characters of the page kept with a note for context.
pub const NOTE_SNIPPET_CHARS: usize = 100;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub book_id: String,
    pub page_index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub created_at: SystemTime,
}

impl Note {
    pub fn new(book_id: &str, page_index: usize, text: &str, page_text: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id: book_id.to_string(),
            page_index,
            text: text.trim().to_string(),
            snippet: page_text.map(|page| page.chars().take(NOTE_SNIPPET_CHARS).collect()),
            created_at: SystemTime::now(),
        }
    }
}

pub struct NoteBook {
    path: PathBuf,
}

impl NoteBook {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn notes_for(&self, book_id: &str) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .read_all()
            .unwrap_or_else(|err| {
                warn!(?err, "failed to load notes");
                Vec::new()
            })
            .into_iter()
            .filter(|note| note.book_id == book_id)
            .collect();
        notes.sort_by_key(|note| (note.page_index, note.created_at));
        notes
    }

    /// Inserts the note, or replaces the stored note with the same id.
    pub fn save(&self, note: &Note) {
        let result = self.read_all().and_then(|mut notes| {
            match notes.iter_mut().find(|existing| existing.id == note.id) {
                Some(existing) => *existing = note.clone(),
                None => notes.push(note.clone()),
            }
            self.write_all(&notes)
        });
        if let Err(err) = result {
            warn!(?err, id = %note.id, "failed to save note");
        }
    }

    /// Returns whether a note was removed.
    pub fn delete(&self, id: Uuid) -> bool {
        let result = self.read_all().and_then(|mut notes| {
            let before = notes.len();
            notes.retain(|note| note.id != id);
            let removed = notes.len() != before;
            if removed {
                self.write_all(&notes)?;
            }
            Ok(removed)
        });
        result.unwrap_or_else(|err| {
            warn!(?err, %id, "failed to delete note");
            false
        })
    }

    fn read_all(&self) -> Result<Vec<Note>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read notes file {:?}", self.path))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to decode notes file {:?}", self.path))
    }

    fn write_all(&self, notes: &[Note]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create notes directory {:?}", parent))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(notes)?)
            .with_context(|| format!("failed to write notes file {:?}", tmp))?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Converts the older one-note-per-page map of a book into notes.
pub fn migrate_page_notes(book_id: &str, page_notes: &BTreeMap<usize, String>) -> Vec<Note> {
    page_notes
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(&page_index, text)| Note::new(book_id, page_index, text, None))
        .collect()
}
