//! Database Error Types
//!
//! Error types raised by the note store backends. Store trait methods return
//! `anyhow::Result`, so these surface wrapped with context; callers that
//! care about the cause can `downcast_ref::<DatabaseError>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Store operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Reading or writing a deck file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Deck file or note content could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sealing or opening an encrypted value failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Update or delete targeted a note the deck does not hold
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Add targeted an id the deck already holds
    #[error("Note already exists: {id}")]
    DuplicateNote { id: String },

    /// Backend refused the write
    #[error("Write rejected: {context}")]
    Rejected { context: String },
}

impl DatabaseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    pub fn note_not_found(id: impl Into<String>) -> Self {
        Self::NoteNotFound { id: id.into() }
    }

    pub fn duplicate_note(id: impl Into<String>) -> Self {
        Self::DuplicateNote { id: id.into() }
    }

    pub fn rejected(context: impl Into<String>) -> Self {
        Self::Rejected {
            context: context.into(),
        }
    }
}
