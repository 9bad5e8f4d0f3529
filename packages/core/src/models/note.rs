//! Notes and the per-deck note collection
//!
//! A [`NoteCollection`] is the unit every backlink, graph and tree algorithm
//! works over: it is loaded wholesale when a deck opens and mutated in place
//! during a session. Title uniqueness (case-insensitive) is enforced here, at
//! write time, not by storage.

use crate::models::node::{Document, ValidationError};
use crate::utils::generate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single rich-text note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: Document,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a note with a fresh id, timestamped `now`
    pub fn new(title: impl Into<String>, content: Document, now: DateTime<Utc>) -> Self {
        Self::with_id(generate_id(), title, content, now)
    }

    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        content: Document,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sparse update payload: only the provided fields change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Document>,

    pub updated_at: DateTime<Utc>,
}

impl NoteUpdate {
    /// Full-content update, as produced by rename/delete propagation
    pub fn content(id: impl Into<String>, content: Document, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: Some(content),
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Titles compare trimmed and case-insensitively
fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// All notes of one deck, keyed by note id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteCollection {
    notes: HashMap<String, Note>,
}

impl NoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.notes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Insert or replace a note, returning the previous value
    pub fn insert(&mut self, note: Note) -> Option<Note> {
        self.notes.insert(note.id.clone(), note)
    }

    pub fn remove(&mut self, id: &str) -> Option<Note> {
        self.notes.remove(id)
    }

    /// Notes in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    /// Note ids sorted ascending, for deterministic traversal
    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.notes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Case-insensitive title lookup
    pub fn find_by_title(&self, title: &str) -> Option<&Note> {
        let key = title_key(title);
        self.notes.values().find(|note| title_key(&note.title) == key)
    }

    /// Check that `title` may be used by note `exclude` (or by a new note when `None`)
    pub fn validate_title(&self, title: &str, exclude: Option<&str>) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let key = title_key(title);
        let clash = self
            .notes
            .values()
            .any(|note| Some(note.id.as_str()) != exclude && title_key(&note.title) == key);
        if clash {
            return Err(ValidationError::DuplicateTitle {
                title: title.to_string(),
            });
        }
        Ok(())
    }

    /// Apply a sparse update in memory. Returns false when the note is unknown.
    pub fn apply_update(&mut self, update: &NoteUpdate) -> bool {
        let Some(note) = self.notes.get_mut(&update.id) else {
            return false;
        };
        if let Some(title) = &update.title {
            note.title = title.clone();
        }
        if let Some(content) = &update.content {
            note.content = content.clone();
        }
        note.updated_at = update.updated_at;
        true
    }
}

impl FromIterator<Note> for NoteCollection {
    fn from_iter<T: IntoIterator<Item = Note>>(iter: T) -> Self {
        Self {
            notes: iter.into_iter().map(|note| (note.id.clone(), note)).collect(),
        }
    }
}
