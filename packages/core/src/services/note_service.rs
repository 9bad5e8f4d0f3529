//! Note Service - Deck Session Orchestration
//!
//! Owns the in-memory copy of one open deck and coordinates everything that
//! touches it:
//!
//! - Opening a deck (load, reconcile the sidebar tree, persist the repair)
//! - Creating, importing, editing, renaming and deleting notes
//! - Debounced saving through one [`NoteSaveTracker`] per edited note
//! - Rename and delete propagation to every backlinking note
//! - Read-side queries: backlinks, graph, tag index
//!
//! # Consistency
//!
//! The in-memory collection is authoritative for the session. Stores are
//! written after the collection changes and are never read back. Propagation
//! payloads are persisted concurrently and may partially fail; failures are
//! logged and reported in a [`PropagationReport`] but neither retried nor
//! rolled back. [`NoteService::sweep_dangling_links`] repairs what a failed
//! delete propagation leaves behind.

use crate::config::DeckConfig;
use crate::db::NoteStore;
use crate::import::import_markdown;
use crate::models::time::{SystemTimeProvider, TimeProvider};
use crate::models::{
    DeckSession, Document, Element, ElementKind, NodePath, Note, NoteCollection, NoteTree, NoteUpdate,
    TextRange,
};
use crate::services::backlinks::{compute_backlinks, Backlink};
use crate::services::error::NoteServiceError;
use crate::services::graph::{compute_graph, LinkGraph};
use crate::services::propagation::{propagate_delete, propagate_rename, sweep_dangling_links};
use crate::services::reconcile::reconcile_tree;
use crate::services::save_policy::{NoteSaveTracker, PendingSave, SaveCommand, SaveEvent, SaveState};
use crate::services::tags::tag_index;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Outcome of persisting propagation payloads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Notes whose rewritten content was persisted
    pub updated: Vec<String>,
    /// Notes whose write failed, with the store's message
    pub failed: Vec<(String, String)>,
}

impl PropagationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
struct DeckState {
    collection: NoteCollection,
    tree: NoteTree,
}

/// Save tracker plus its armed debounce timer
struct TrackedNote {
    tracker: NoteSaveTracker,
    timer: Option<JoinHandle<()>>,
}

impl TrackedNote {
    fn new(note_id: &str) -> Self {
        Self {
            tracker: NoteSaveTracker::new(note_id),
            timer: None,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Session over one deck
///
/// Cheap to clone; clones share the same deck state, trackers and store.
///
/// # Examples
///
/// ```rust,no_run
/// use decknote_core::config::DeckConfig;
/// use decknote_core::db::MemoryStore;
/// use decknote_core::models::{DeckSession, Document};
/// use decknote_core::services::NoteService;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let store = Arc::new(MemoryStore::new());
///     let session = DeckSession::new("user-1", "deck-1");
///     let service = NoteService::open(store, session, DeckConfig::default()).await?;
///
///     let note = service.create_note("Groceries", Document::empty(), None).await?;
///     service.edit_title(&note.id, "Shopping").await?;
///     service.flush(&note.id).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
    session: DeckSession,
    config: DeckConfig,
    clock: Arc<dyn TimeProvider>,
    state: Arc<RwLock<DeckState>>,
    trackers: Arc<Mutex<HashMap<String, TrackedNote>>>,
}

impl NoteService {
    /// Open a deck with the wall clock
    pub async fn open(
        store: Arc<dyn NoteStore>,
        session: DeckSession,
        config: DeckConfig,
    ) -> Result<Self, NoteServiceError> {
        Self::open_with_clock(store, session, config, Arc::new(SystemTimeProvider)).await
    }

    /// Open a deck: check the config, load the deck, reconcile the sidebar
    /// tree against the notes and persist the tree if reconciliation changed it
    pub async fn open_with_clock(
        store: Arc<dyn NoteStore>,
        session: DeckSession,
        config: DeckConfig,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, NoteServiceError> {
        config.validate().map_err(NoteServiceError::invalid_config)?;

        let snapshot = store.load_deck(&session).await.map_err(|e| {
            NoteServiceError::persistence_failed(format!(
                "loading deck {}: {:#}",
                session.deck_id, e
            ))
        })?;
        let (collection, mut tree) = snapshot.into_parts();

        tracing::info!(
            "Opened deck {} with {} notes",
            session.deck_id,
            collection.len()
        );

        if reconcile_tree(&mut tree, &collection) {
            if let Err(e) = store.save_note_tree(&session, &tree).await {
                tracing::warn!("Failed to persist reconciled tree: {}", e);
            }
        }

        Ok(Self {
            store,
            session,
            config,
            clock,
            state: Arc::new(RwLock::new(DeckState { collection, tree })),
            trackers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn session(&self) -> &DeckSession {
        &self.session
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn note(&self, id: &str) -> Option<Note> {
        self.state.read().await.collection.get(id).cloned()
    }

    /// Case-insensitive lookup by title
    pub async fn find_by_title(&self, title: &str) -> Option<Note> {
        self.state
            .read()
            .await
            .collection
            .find_by_title(title)
            .cloned()
    }

    /// All notes, ordered by id
    pub async fn notes(&self) -> Vec<Note> {
        let state = self.state.read().await;
        state
            .collection
            .sorted_ids()
            .into_iter()
            .filter_map(|id| state.collection.get(id).cloned())
            .collect()
    }

    pub async fn tree(&self) -> NoteTree {
        self.state.read().await.tree.clone()
    }

    pub async fn backlinks(&self, note_id: &str) -> Vec<Backlink> {
        compute_backlinks(&self.state.read().await.collection, note_id)
    }

    pub async fn graph(&self) -> LinkGraph {
        compute_graph(&self.state.read().await.collection)
    }

    pub async fn tag_index(&self) -> BTreeMap<String, Vec<String>> {
        tag_index(&self.state.read().await.collection)
    }

    // =========================================================================
    // Create / import / delete
    // =========================================================================

    /// Create a note and add it to the sidebar tree under `parent`
    /// (top level when `None` or unknown).
    ///
    /// The title is validated before any store call is made.
    pub async fn create_note(
        &self,
        title: &str,
        content: Document,
        parent: Option<&str>,
    ) -> Result<Note, NoteServiceError> {
        content.validate()?;

        // Held across the store call so two creates cannot claim one title
        let mut state = self.state.write().await;
        state.collection.validate_title(title, None)?;

        let note = Note::new(title, content, self.clock.now());
        self.store
            .add_note(&self.session, &note)
            .await
            .map_err(|e| NoteServiceError::persistence_failed(format!("{:#}", e)))?;

        state.collection.insert(note.clone());
        if !state.tree.insert(&note.id, parent) {
            state.tree.insert(&note.id, None);
        }
        let tree = state.tree.clone();
        drop(state);

        tracing::debug!("Created note {} ({})", note.id, note.title);
        self.persist_tree(&tree).await;
        Ok(note)
    }

    /// Import markdown text as a new note
    pub async fn import_markdown_note(
        &self,
        title: &str,
        markdown: &str,
        parent: Option<&str>,
    ) -> Result<Note, NoteServiceError> {
        if markdown.len() > self.config.max_import_bytes {
            return Err(NoteServiceError::import_rejected(format!(
                "document is {} bytes, limit is {}",
                markdown.len(),
                self.config.max_import_bytes
            )));
        }

        let content = import_markdown(markdown);
        if content.children().len() > self.config.max_import_blocks {
            return Err(NoteServiceError::import_rejected(format!(
                "document has {} blocks, limit is {}",
                content.children().len(),
                self.config.max_import_blocks
            )));
        }

        self.create_note(title, content, parent).await
    }

    /// Delete a note.
    ///
    /// Links to the note are unwrapped in every other note and those payloads
    /// are persisted before the note itself is deleted. Pending edits to the
    /// note are discarded.
    pub async fn delete_note(&self, id: &str) -> Result<PropagationReport, NoteServiceError> {
        if !self.state.read().await.collection.contains(id) {
            return Err(NoteServiceError::note_not_found(id));
        }

        if let Some(mut tracked) = self.lock_trackers().remove(id) {
            tracked.cancel_timer();
        }

        let updates = {
            let mut state = self.state.write().await;
            propagate_delete(&mut state.collection, id, self.clock.now())
        };
        self.refresh_pending(&updates);
        let report = self.persist_updates(updates).await;

        self.store
            .delete_note(&self.session, id)
            .await
            .map_err(|e| NoteServiceError::persistence_failed(format!("{:#}", e)))?;

        let tree = {
            let mut state = self.state.write().await;
            state.collection.remove(id);
            state.tree.remove(id);
            state.tree.clone()
        };
        self.persist_tree(&tree).await;

        tracing::info!(
            "Deleted note {}; unwrapped links in {} notes",
            id,
            report.updated.len() + report.failed.len()
        );
        Ok(report)
    }

    // =========================================================================
    // Edits and saving
    // =========================================================================

    /// Change a note's title in memory and schedule a save.
    ///
    /// Rejects empty titles and titles already used by another note
    /// (case-insensitive) before anything changes.
    pub async fn edit_title(&self, id: &str, title: &str) -> Result<(), NoteServiceError> {
        {
            let mut state = self.state.write().await;
            if !state.collection.contains(id) {
                return Err(NoteServiceError::note_not_found(id));
            }
            state.collection.validate_title(title, Some(id))?;
            state.collection.apply_update(&NoteUpdate {
                id: id.to_string(),
                title: Some(title.to_string()),
                content: None,
                updated_at: self.clock.now(),
            });
        }
        self.track(id, SaveEvent::TitleEdited(title.to_string()));
        Ok(())
    }

    /// Replace a note's content in memory and schedule a save
    pub async fn edit_content(&self, id: &str, content: Document) -> Result<(), NoteServiceError> {
        content.validate()?;
        {
            let mut state = self.state.write().await;
            let update = NoteUpdate::content(id, content.clone(), self.clock.now());
            if !state.collection.apply_update(&update) {
                return Err(NoteServiceError::note_not_found(id));
            }
        }
        self.track(id, SaveEvent::ContentEdited(content));
        Ok(())
    }

    /// Turn the selected text of a note into a link to `target_id`.
    ///
    /// The link shows the selected text; when that differs from the target's
    /// title it is kept as the link's custom text. Returns the link's path.
    pub async fn link_selection(
        &self,
        id: &str,
        range: &TextRange,
        target_id: &str,
    ) -> Result<NodePath, NoteServiceError> {
        let (path, content) = {
            let mut state = self.state.write().await;
            let target_title = state
                .collection
                .get(target_id)
                .map(|note| note.title.clone())
                .ok_or_else(|| NoteServiceError::note_not_found(target_id))?;
            let note = state
                .collection
                .get_mut(id)
                .ok_or_else(|| NoteServiceError::note_not_found(id))?;

            let mut content = note.content.clone();
            let link = Element::note_link(target_id, &target_title);
            let path = content.wrap_range(range, link)?;
            let label = content
                .get(&path)
                .map(|node| node.text_content())
                .unwrap_or_default();
            if label != target_title {
                content.update_element(&path, |el| {
                    if let ElementKind::NoteLink { custom_text, .. } = &mut el.kind {
                        *custom_text = Some(label.clone());
                    }
                })?;
            }

            note.content = content.clone();
            note.updated_at = self.clock.now();
            (path, content)
        };

        self.track(id, SaveEvent::ContentEdited(content));
        Ok(path)
    }

    /// Rename a note and save immediately, propagating the new title
    pub async fn rename_note(
        &self,
        id: &str,
        new_title: &str,
    ) -> Result<PropagationReport, NoteServiceError> {
        self.edit_title(id, new_title).await?;
        self.flush(id).await
    }

    /// Save a note's pending edits now instead of waiting for the debounce.
    ///
    /// Returns without saving when nothing is pending or a save is already
    /// in flight.
    pub async fn flush(&self, id: &str) -> Result<PropagationReport, NoteServiceError> {
        let command = {
            let mut trackers = self.lock_trackers();
            let Some(tracked) = trackers.get_mut(id) else {
                return Ok(PropagationReport::default());
            };
            tracked.cancel_timer();
            tracked.tracker.handle(SaveEvent::Flush)
        };

        match command {
            SaveCommand::Persist(pending) => self.persist(id, pending).await,
            _ => Ok(PropagationReport::default()),
        }
    }

    /// Flush every note with pending edits
    pub async fn flush_all(&self) -> Result<(), NoteServiceError> {
        for id in self.unsaved_notes() {
            self.flush(&id).await?;
        }
        Ok(())
    }

    pub fn save_state(&self, id: &str) -> SaveState {
        self.lock_trackers()
            .get(id)
            .map(|tracked| tracked.tracker.state().clone())
            .unwrap_or(SaveState::Clean)
    }

    /// Title and content both confirmed persisted
    pub fn is_synced(&self, id: &str) -> bool {
        self.lock_trackers()
            .get(id)
            .is_none_or(|tracked| tracked.tracker.is_synced())
    }

    /// Warning to show before navigating away from `id`, if any
    pub fn navigation_warning(&self, id: &str) -> Option<&'static str> {
        self.lock_trackers()
            .get(id)
            .and_then(|tracked| tracked.tracker.navigation_warning())
    }

    /// Ids of notes with unsaved edits, sorted
    pub fn unsaved_notes(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lock_trackers()
            .iter()
            .filter(|(_, tracked)| !tracked.tracker.is_synced())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Sidebar tree
    // =========================================================================

    /// Move a note in the sidebar tree and persist the tree
    pub async fn move_note(
        &self,
        id: &str,
        new_parent: Option<&str>,
        index: usize,
    ) -> Result<(), NoteServiceError> {
        let tree = {
            let mut state = self.state.write().await;
            if !state.tree.move_item(id, new_parent, index) {
                return Err(NoteServiceError::note_not_found(id));
            }
            state.tree.clone()
        };
        self.persist_tree(&tree).await;
        Ok(())
    }

    /// Toggle a sidebar entry's collapsed flag; returns the new value
    pub async fn toggle_collapsed(&self, id: &str) -> Result<bool, NoteServiceError> {
        let (collapsed, tree) = {
            let mut state = self.state.write().await;
            let collapsed = state
                .tree
                .toggle_collapsed(id)
                .ok_or_else(|| NoteServiceError::note_not_found(id))?;
            (collapsed, state.tree.clone())
        };
        self.persist_tree(&tree).await;
        Ok(collapsed)
    }

    // =========================================================================
    // Repair
    // =========================================================================

    /// Unwrap links to notes that no longer exist and persist the result
    pub async fn sweep_dangling_links(&self) -> PropagationReport {
        let updates = {
            let mut state = self.state.write().await;
            sweep_dangling_links(&mut state.collection, self.clock.now())
        };
        self.refresh_pending(&updates);
        self.persist_updates(updates).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_trackers(&self) -> MutexGuard<'_, HashMap<String, TrackedNote>> {
        self.trackers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Feed an edit to the note's tracker and carry out the resulting command
    fn track(&self, id: &str, event: SaveEvent) {
        let mut trackers = self.lock_trackers();
        let tracked = trackers
            .entry(id.to_string())
            .or_insert_with(|| TrackedNote::new(id));
        if tracked.tracker.handle(event) == SaveCommand::ArmTimer {
            self.arm_timer(id, tracked);
        }
    }

    /// Restart the debounce timer for `id`
    fn arm_timer(&self, id: &str, tracked: &mut TrackedNote) {
        tracked.cancel_timer();
        let service = self.clone();
        let id = id.to_string();
        let delay = self.config.save_debounce();
        tracked.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.on_timer(&id).await;
        }));
    }

    async fn on_timer(&self, id: &str) {
        let command = {
            let mut trackers = self.lock_trackers();
            let Some(tracked) = trackers.get_mut(id) else {
                return;
            };
            // This task is the armed timer; drop the handle without aborting
            tracked.timer = None;
            tracked.tracker.handle(SaveEvent::TimerFired)
        };

        if let SaveCommand::Persist(pending) = command {
            if let Err(e) = self.persist(id, pending).await {
                tracing::warn!("Debounced save of {} failed: {}", id, e);
            }
        }
    }

    /// One save cycle: persist the note, then propagate a rename
    async fn persist(
        &self,
        id: &str,
        pending: PendingSave,
    ) -> Result<PropagationReport, NoteServiceError> {
        let now = self.clock.now();
        let update = NoteUpdate {
            id: id.to_string(),
            title: pending.title.clone(),
            content: pending.content.clone(),
            updated_at: now,
        };

        if let Err(e) = self.store.update_note(&self.session, &update).await {
            let message = format!("{:#}", e);
            tracing::warn!("Failed to save note {}: {}", id, message);
            self.finish_save(id, SaveEvent::PersistErr(message.clone()));
            return Err(NoteServiceError::persistence_failed(message));
        }

        let report = match &pending.title {
            Some(title) => {
                let updates = {
                    let mut state = self.state.write().await;
                    propagate_rename(&mut state.collection, id, title, now)
                };
                self.refresh_pending(&updates);
                self.persist_updates(updates).await
            }
            None => PropagationReport::default(),
        };

        self.finish_save(id, SaveEvent::PersistOk);
        Ok(report)
    }

    fn finish_save(&self, id: &str, event: SaveEvent) {
        let mut trackers = self.lock_trackers();
        if let Some(tracked) = trackers.get_mut(id) {
            if tracked.tracker.handle(event) == SaveCommand::ArmTimer {
                self.arm_timer(id, tracked);
            }
        }
    }

    /// Propagation rewrote these notes in memory. A note that still has an
    /// unsaved content edit would later save its stale copy, so its pending
    /// content is replaced with the rewritten one.
    fn refresh_pending(&self, updates: &[NoteUpdate]) {
        let mut trackers = self.lock_trackers();
        for update in updates {
            let (Some(tracked), Some(content)) = (trackers.get_mut(&update.id), &update.content)
            else {
                continue;
            };
            if !tracked.tracker.content_dirty() {
                continue;
            }
            let event = SaveEvent::ContentEdited(content.clone());
            if tracked.tracker.handle(event) == SaveCommand::ArmTimer {
                self.arm_timer(&update.id, tracked);
            }
        }
    }

    /// Persist propagation payloads concurrently, tolerating partial failure
    async fn persist_updates(&self, updates: Vec<NoteUpdate>) -> PropagationReport {
        let results = join_all(
            updates
                .iter()
                .map(|update| self.store.update_note(&self.session, update)),
        )
        .await;

        let mut report = PropagationReport::default();
        for (update, result) in updates.iter().zip(results) {
            match result {
                Ok(()) => report.updated.push(update.id.clone()),
                Err(e) => {
                    tracing::warn!("Failed to persist propagated change to {}: {}", update.id, e);
                    report.failed.push((update.id.clone(), format!("{:#}", e)));
                }
            }
        }
        tracing::debug!(
            "Persisted {} propagated updates ({} failed)",
            report.updated.len(),
            report.failed.len()
        );
        report
    }

    /// Tree writes are best-effort; the next open reconciles the tree anyway
    async fn persist_tree(&self, tree: &NoteTree) {
        if let Err(e) = self.store.save_note_tree(&self.session, tree).await {
            tracing::warn!("Failed to persist sidebar tree: {}", e);
        }
    }
}
