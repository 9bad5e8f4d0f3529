//! Deck session and persisted deck snapshot
//!
//! The identity/session layer is external: callers hand the core a
//! [`DeckSession`] naming the current user and deck, and the core never
//! manages its lifecycle.

use crate::models::note::{Note, NoteCollection};
use crate::models::note_tree::NoteTree;
use serde::{Deserialize, Serialize};

/// Current user and deck, as supplied by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSession {
    pub user_id: String,
    pub deck_id: String,
}

impl DeckSession {
    pub fn new(user_id: impl Into<String>, deck_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            deck_id: deck_id.into(),
        }
    }
}

/// Everything a store returns when a deck is opened
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckSnapshot {
    pub notes: Vec<Note>,
    pub tree: NoteTree,
}

impl DeckSnapshot {
    /// Split into the in-memory collection and sidebar tree
    pub fn into_parts(self) -> (NoteCollection, NoteTree) {
        (self.notes.into_iter().collect(), self.tree)
    }
}
