//! Per-note save state machine
//!
//! Tracks title and content edits of one open note independently and decides
//! when to persist them. The tracker is pure: it consumes [`SaveEvent`]s and
//! answers with a [`SaveCommand`] for the caller to carry out (arm the
//! debounce timer, or persist a payload). Timers and persistence live in
//! [`NoteService`](crate::services::NoteService).
//!
//! ```text
//!            edit                 timer / flush              ok, nothing new
//!   Clean ─────────▶ Dirty ──────────────────────▶ Saving ─────────────────▶ Clean
//!                     ▲  ▲ edit (re-arm)            │  │ ok, edited meanwhile
//!                     │  └──────────────────────────┘  └──────────────▶ Dirty
//!                     │ edit                        │ err
//!                SaveFailed ◀───────────────────────┘
//! ```

use crate::models::Document;

/// Message shown when leaving a note with unsaved edits
pub const UNSAVED_CHANGES_WARNING: &str =
    "This note has unsaved changes. Leave anyway?";

#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    /// Nothing to save
    Clean,
    /// Edits pending, debounce timer armed
    Dirty,
    /// One persistence attempt in flight
    Saving,
    /// Last attempt failed; edits are kept until a later save succeeds
    SaveFailed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    TitleEdited(String),
    ContentEdited(Document),
    TimerFired,
    Flush,
    PersistOk,
    PersistErr(String),
}

/// Partial update to persist: only dirty fields are present
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub title: Option<String>,
    pub content: Option<Document>,
}

impl PendingSave {
    /// Whether this save renames the note, which requires link propagation
    pub fn renames(&self) -> bool {
        self.title.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveCommand {
    None,
    /// (Re)start the debounce timer, cancelling any armed one
    ArmTimer,
    Persist(PendingSave),
}

/// Unsaved value plus an edit counter, so a save that raced with newer
/// edits does not clear them
#[derive(Debug, Clone, Default)]
struct DirtyField<T> {
    value: Option<T>,
    revision: u64,
    in_flight: Option<u64>,
}

impl<T: Clone> DirtyField<T> {
    fn set(&mut self, value: T) {
        self.value = Some(value);
        self.revision += 1;
    }

    fn is_dirty(&self) -> bool {
        self.value.is_some()
    }

    fn begin_save(&mut self) -> Option<T> {
        let value = self.value.clone()?;
        self.in_flight = Some(self.revision);
        Some(value)
    }

    /// Clear the value if nothing was edited since the save started
    fn confirm(&mut self) {
        if self.in_flight.take() == Some(self.revision) {
            self.value = None;
        }
    }

    fn abort(&mut self) {
        self.in_flight = None;
    }
}

/// Save state of one open note
#[derive(Debug, Clone)]
pub struct NoteSaveTracker {
    note_id: String,
    state: SaveState,
    title: DirtyField<String>,
    content: DirtyField<Document>,
}

impl NoteSaveTracker {
    pub fn new(note_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            state: SaveState::Clean,
            title: DirtyField::default(),
            content: DirtyField::default(),
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn title_dirty(&self) -> bool {
        self.title.is_dirty()
    }

    pub fn content_dirty(&self) -> bool {
        self.content.is_dirty()
    }

    /// Both fields confirmed persisted
    pub fn is_synced(&self) -> bool {
        !self.title_dirty() && !self.content_dirty()
    }

    /// Warning to show before navigating away, if there are unsaved edits
    pub fn navigation_warning(&self) -> Option<&'static str> {
        (!self.is_synced()).then_some(UNSAVED_CHANGES_WARNING)
    }

    /// Feed one event and get the action to carry out
    pub fn handle(&mut self, event: SaveEvent) -> SaveCommand {
        let command = match event {
            SaveEvent::TitleEdited(title) => {
                self.title.set(title);
                self.edited()
            }
            SaveEvent::ContentEdited(content) => {
                self.content.set(content);
                self.edited()
            }
            SaveEvent::TimerFired | SaveEvent::Flush => self.start_save(),
            SaveEvent::PersistOk => {
                if self.state != SaveState::Saving {
                    return SaveCommand::None;
                }
                self.title.confirm();
                self.content.confirm();
                if self.is_synced() {
                    self.state = SaveState::Clean;
                    SaveCommand::None
                } else {
                    self.state = SaveState::Dirty;
                    SaveCommand::ArmTimer
                }
            }
            SaveEvent::PersistErr(error) => {
                if self.state != SaveState::Saving {
                    return SaveCommand::None;
                }
                self.title.abort();
                self.content.abort();
                self.state = SaveState::SaveFailed { error };
                SaveCommand::None
            }
        };
        tracing::debug!("Note {} save state now {:?}", self.note_id, self.state);
        command
    }

    fn edited(&mut self) -> SaveCommand {
        match self.state {
            // The in-flight save finishes first; newer edits re-arm afterwards
            SaveState::Saving => SaveCommand::None,
            _ => {
                self.state = SaveState::Dirty;
                SaveCommand::ArmTimer
            }
        }
    }

    fn start_save(&mut self) -> SaveCommand {
        if self.state == SaveState::Saving || self.is_synced() {
            return SaveCommand::None;
        }
        let pending = PendingSave {
            title: self.title.begin_save(),
            content: self.content.begin_save(),
        };
        self.state = SaveState::Saving;
        SaveCommand::Persist(pending)
    }
}
