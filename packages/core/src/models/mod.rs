//! Data Models
//!
//! This module contains the core data structures used throughout Decknote:
//!
//! - `Node` / `Element` / `Document` - the typed rich-text tree every note is stored as
//! - `Note` / `NoteCollection` - notes of one deck and their title invariant
//! - `NoteTree` - the user-arranged sidebar hierarchy over a deck's notes
//! - `DeckSession` / `DeckSnapshot` - session inputs and the loaded deck shape

mod deck;
mod node;
mod note;
mod note_tree;
pub mod time;

pub use deck::{DeckSession, DeckSnapshot};
pub use node::{
    Descendants, Document, Element, ElementKind, Node, NodePath, Point, TextRange, TextRun,
    ValidationError,
};
pub use note::{Note, NoteCollection, NoteUpdate};
pub use note_tree::{NoteTree, NoteTreeItem};
