//! Service Layer Error Types
//!
//! Errors returned by [`NoteService`](super::NoteService). Validation errors
//! are raised before any store call is made; persistence errors carry the
//! store's message as context.

use crate::models::ValidationError;
use crate::operations::TransformError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NoteServiceError {
    /// Note not found by ID
    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// Title or document failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Document edit was refused
    #[error("Edit failed: {0}")]
    Transform(#[from] TransformError),

    /// Store rejected or failed a write
    #[error("Persistence failed: {context}")]
    PersistenceFailed { context: String },

    /// Markdown import exceeded a configured limit
    #[error("Import rejected: {reason}")]
    ImportRejected { reason: String },

    /// Deck configuration is unusable
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl NoteServiceError {
    /// Create a note not found error
    pub fn note_not_found(id: impl Into<String>) -> Self {
        Self::NoteNotFound { id: id.into() }
    }

    /// Create a persistence failed error
    pub fn persistence_failed(context: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            context: context.into(),
        }
    }

    /// Create an import rejected error
    pub fn import_rejected(reason: impl Into<String>) -> Self {
        Self::ImportRejected {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the user can fix the input and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ImportRejected { .. } | Self::PersistenceFailed { .. }
        )
    }
}
