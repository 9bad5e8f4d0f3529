//! Business Services
//!
//! This module contains the backlink engine and the session service on top
//! of it:
//!
//! - `link_extraction` / `backlinks` - which notes link where
//! - `propagation` - rename and delete rewrites across the deck
//! - `reconcile` / `graph` - sidebar tree repair and the link graph
//! - `tags` - tag extraction and the deck-wide tag index
//! - `save_policy` - the per-note save state machine
//! - `NoteService` - orchestrates the above against a `NoteStore`
//!
//! Everything except `NoteService` is synchronous and works on an in-memory
//! `NoteCollection`.

pub mod backlinks;
pub mod error;
pub mod graph;
pub mod link_extraction;
pub mod note_service;
pub mod propagation;
pub mod reconcile;
pub mod save_policy;
pub mod tags;

#[cfg(test)]
mod note_service_test;

pub use backlinks::{compute_backlinks, Backlink, BacklinkMatch};
pub use error::NoteServiceError;
pub use graph::{compute_graph, node_radius, GraphLink, GraphNode, LinkGraph};
pub use link_extraction::{extract_links, LinkMatch, Links};
pub use note_service::{NoteService, PropagationReport};
pub use propagation::{propagate_delete, propagate_rename, sweep_dangling_links};
pub use reconcile::{reconcile_tree, reconciled};
pub use save_policy::{
    NoteSaveTracker, PendingSave, SaveCommand, SaveEvent, SaveState, UNSAVED_CHANGES_WARNING,
};
pub use tags::{extract_tags, tag_index};
