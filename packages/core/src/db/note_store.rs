//! NoteStore Trait - Persistence Abstraction Layer
//!
//! The narrow interface the note service needs from a persistence backend.
//! Backends are eventually consistent and independently retryable; the
//! service never assumes one write is visible to another reader.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async so embedded and networked
//!    backends share one interface
//! 2. **Whole-deck load**: a deck is loaded wholesale when opened; later
//!    writes are per note
//! 3. **Separate tree field**: the sidebar tree is persisted on its own, never
//!    interleaved with note content
//! 4. **Error Handling**: `anyhow::Result` for flexible error context;
//!    backends raise [`DatabaseError`](super::DatabaseError) underneath
//!
//! # Examples
//!
//! ```rust,no_run
//! use decknote_core::db::{MemoryStore, NoteStore};
//! use decknote_core::models::DeckSession;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store: Arc<dyn NoteStore> = Arc::new(MemoryStore::new());
//!     let session = DeckSession::new("user-1", "deck-1");
//!
//!     let snapshot = store.load_deck(&session).await?;
//!     assert!(snapshot.notes.is_empty());
//!     Ok(())
//! }
//! ```

use crate::models::{DeckSession, DeckSnapshot, Note, NoteTree, NoteUpdate};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over note persistence backends
///
/// Implementations must be `Send + Sync`; the service shares one store
/// between its debounce tasks.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Load every note of the session's deck plus its sidebar tree.
    ///
    /// A deck that was never written loads as empty.
    async fn load_deck(&self, session: &DeckSession) -> Result<DeckSnapshot>;

    /// Persist a new note
    ///
    /// # Errors
    ///
    /// Fails if the id already exists in the deck or the backend rejects the write.
    async fn add_note(&self, session: &DeckSession, note: &Note) -> Result<()>;

    /// Apply a partial update; only fields present in `update` change
    ///
    /// # Errors
    ///
    /// Fails if the note does not exist or the backend rejects the write.
    async fn update_note(&self, session: &DeckSession, update: &NoteUpdate) -> Result<()>;

    /// Remove a note
    async fn delete_note(&self, session: &DeckSession, id: &str) -> Result<()>;

    /// Replace the deck's sidebar tree
    async fn save_note_tree(&self, session: &DeckSession, tree: &NoteTree) -> Result<()>;
}
