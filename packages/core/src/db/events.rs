//! Domain Events for note stores
//!
//! Stores emit these on a tokio broadcast channel after a write is applied,
//! so other parts of the system (a sync layer, a UI bridge) can observe
//! changes without coupling to a backend.
//!
//! # Event Flow
//!
//! 1. A store applies an add/update/delete/tree write
//! 2. The matching event is sent on the broadcast channel
//! 3. Every subscriber receives it asynchronously; sending with no
//!    subscribers is not an error

use crate::models::{Note, NoteUpdate};
use serde::Serialize;

/// Domain events emitted by note stores
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A note was added to a deck
    #[serde(rename_all = "camelCase")]
    NoteCreated { deck_id: String, note: Note },

    /// A partial update was applied to a note
    #[serde(rename_all = "camelCase")]
    NoteUpdated { deck_id: String, update: NoteUpdate },

    /// A note was removed from a deck
    #[serde(rename_all = "camelCase")]
    NoteDeleted { deck_id: String, id: String },

    /// A deck's sidebar tree was replaced
    #[serde(rename_all = "camelCase")]
    TreeSaved { deck_id: String },
}

impl DomainEvent {
    /// String form of the event type, for logs
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NoteCreated { .. } => "note:created",
            DomainEvent::NoteUpdated { .. } => "note:updated",
            DomainEvent::NoteDeleted { .. } => "note:deleted",
            DomainEvent::TreeSaved { .. } => "tree:saved",
        }
    }

    pub fn deck_id(&self) -> &str {
        match self {
            DomainEvent::NoteCreated { deck_id, .. }
            | DomainEvent::NoteUpdated { deck_id, .. }
            | DomainEvent::NoteDeleted { deck_id, .. }
            | DomainEvent::TreeSaved { deck_id } => deck_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The serialized shape is flat: `type` sits next to the payload fields
    #[test]
    fn test_domain_event_serialization_contract() {
        let event = DomainEvent::NoteDeleted {
            deck_id: "deck-1".to_string(),
            id: "note-9".to_string(),
        };
        let parsed = serde_json::to_value(&event).unwrap();

        assert_eq!(parsed.get("type").unwrap(), "noteDeleted");
        assert_eq!(parsed.get("deckId").unwrap(), "deck-1");
        assert_eq!(parsed.get("id").unwrap(), "note-9");
        assert_eq!(event.event_type(), "note:deleted");
        assert_eq!(event.deck_id(), "deck-1");
    }
}
