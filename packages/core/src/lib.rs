//! Decknote Core Business Logic Layer
//!
//! This crate provides the document model, backlink engine and deck session
//! orchestration for Decknote, a note-taking app where notes link to each
//! other by id.
//!
//! # Architecture
//!
//! - **Typed document tree**: every note is a tree of elements and text runs;
//!   structural edits go through path-addressed transforms
//! - **Links by id**: note links carry the target id, so backlinks, rename
//!   propagation and the link graph are pure functions over the deck
//! - **In-memory deck**: a deck is loaded wholesale; stores are written
//!   behind it and never read back during a session
//! - **Debounced saves**: a per-note state machine collapses edits into one
//!   partial update and keeps unsaved edits flagged until confirmed
//!
//! # Modules
//!
//! - [`models`] - Document tree, notes, sidebar tree, session inputs
//! - [`operations`] - Document and table transforms
//! - [`import`] - Markdown parsing, normalization and conversion
//! - [`services`] - Backlinks, propagation, graph, save policy, NoteService
//! - [`db`] - Store trait, memory and JSON file stores, encryption
//! - [`config`] - Deck session configuration
//! - [`utils`] - Id generation and html-to-text

pub mod config;
pub mod db;
pub mod import;
pub mod models;
pub mod operations;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::DeckConfig;
pub use models::*;
pub use services::*;
