//! In-memory note store
//!
//! Keeps decks in process memory. Used by tests and as the store behind a
//! service that has no data directory. Supports failure injection so callers
//! can exercise persistence and partial-propagation failures.

use super::error::DatabaseError;
use super::events::DomainEvent;
use super::note_store::NoteStore;
use crate::models::{DeckSession, DeckSnapshot, Note, NoteCollection, NoteTree, NoteUpdate};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, RwLock};

/// Broadcast capacity for domain events
const EVENT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct DeckData {
    notes: NoteCollection,
    tree: NoteTree,
}

#[derive(Debug, Default)]
struct FailurePlan {
    /// Every write fails
    all_writes: bool,
    /// Updates to these note ids fail
    note_updates: HashSet<String>,
}

pub struct MemoryStore {
    decks: RwLock<HashMap<String, DeckData>>,
    failures: Mutex<FailurePlan>,
    write_attempts: AtomicUsize,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            decks: RwLock::new(HashMap::new()),
            failures: Mutex::new(FailurePlan::default()),
            write_attempts: AtomicUsize::new(0),
            event_tx,
        }
    }

    /// Subscribe to domain events for all decks
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Seed a deck directly, bypassing events and failure injection
    pub async fn seed(&self, deck_id: &str, notes: Vec<Note>, tree: NoteTree) {
        let mut decks = self.decks.write().await;
        decks.insert(
            deck_id.to_string(),
            DeckData {
                notes: notes.into_iter().collect(),
                tree,
            },
        );
    }

    /// Stored copy of a note
    pub async fn note(&self, deck_id: &str, id: &str) -> Option<Note> {
        let decks = self.decks.read().await;
        decks.get(deck_id)?.notes.get(id).cloned()
    }

    /// Stored sidebar tree of a deck
    pub async fn tree(&self, deck_id: &str) -> Option<NoteTree> {
        let decks = self.decks.read().await;
        decks.get(deck_id).map(|deck| deck.tree.clone())
    }

    /// Make every write fail (or succeed again)
    pub fn fail_all_writes(&self, fail: bool) {
        self.plan().all_writes = fail;
    }

    /// Make updates to `id` fail
    pub fn fail_updates_for(&self, id: impl Into<String>) {
        self.plan().note_updates.insert(id.into());
    }

    pub fn clear_failures(&self) {
        *self.plan() = FailurePlan::default();
    }

    /// Number of write calls received, successful or not
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn plan(&self) -> std::sync::MutexGuard<'_, FailurePlan> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the attempt and apply any injected failure
    fn check_write(&self, what: &str, note_id: Option<&str>) -> Result<(), DatabaseError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let plan = self.plan();
        let targeted = note_id.is_some_and(|id| plan.note_updates.contains(id));
        if plan.all_writes || targeted {
            return Err(DatabaseError::rejected(format!("injected failure on {}", what)));
        }
        Ok(())
    }

    fn emit(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn load_deck(&self, session: &DeckSession) -> Result<DeckSnapshot> {
        let decks = self.decks.read().await;
        let Some(deck) = decks.get(&session.deck_id) else {
            return Ok(DeckSnapshot::default());
        };
        let notes = deck
            .notes
            .sorted_ids()
            .into_iter()
            .filter_map(|id| deck.notes.get(id).cloned())
            .collect();
        Ok(DeckSnapshot {
            notes,
            tree: deck.tree.clone(),
        })
    }

    async fn add_note(&self, session: &DeckSession, note: &Note) -> Result<()> {
        self.check_write("add", None)?;
        let mut decks = self.decks.write().await;
        let deck = decks.entry(session.deck_id.clone()).or_default();
        if deck.notes.contains(&note.id) {
            return Err(DatabaseError::duplicate_note(&note.id).into());
        }
        deck.notes.insert(note.clone());
        drop(decks);

        self.emit(DomainEvent::NoteCreated {
            deck_id: session.deck_id.clone(),
            note: note.clone(),
        });
        Ok(())
    }

    async fn update_note(&self, session: &DeckSession, update: &NoteUpdate) -> Result<()> {
        self.check_write("update", Some(&update.id))?;
        let mut decks = self.decks.write().await;
        let applied = decks
            .get_mut(&session.deck_id)
            .is_some_and(|deck| deck.notes.apply_update(update));
        if !applied {
            return Err(DatabaseError::note_not_found(&update.id).into());
        }
        drop(decks);

        self.emit(DomainEvent::NoteUpdated {
            deck_id: session.deck_id.clone(),
            update: update.clone(),
        });
        Ok(())
    }

    async fn delete_note(&self, session: &DeckSession, id: &str) -> Result<()> {
        self.check_write("delete", None)?;
        let mut decks = self.decks.write().await;
        let removed = decks
            .get_mut(&session.deck_id)
            .and_then(|deck| deck.notes.remove(id));
        if removed.is_none() {
            return Err(DatabaseError::note_not_found(id).into());
        }
        drop(decks);

        self.emit(DomainEvent::NoteDeleted {
            deck_id: session.deck_id.clone(),
            id: id.to_string(),
        });
        Ok(())
    }

    async fn save_note_tree(&self, session: &DeckSession, tree: &NoteTree) -> Result<()> {
        self.check_write("tree", None)?;
        let mut decks = self.decks.write().await;
        decks.entry(session.deck_id.clone()).or_default().tree = tree.clone();
        drop(decks);

        self.emit(DomainEvent::TreeSaved {
            deck_id: session.deck_id.clone(),
        });
        Ok(())
    }
}
