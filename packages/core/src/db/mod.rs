//! Database Layer
//!
//! Persistence for decks of notes behind the [`NoteStore`] trait:
//!
//! - [`MemoryStore`] - in-process decks with failure injection, for tests and
//!   sessions without a data directory
//! - [`JsonFileStore`] - one JSON file per deck, optionally encrypted at rest
//!
//! Both emit [`DomainEvent`]s on a broadcast channel after each applied write.
//! Stores are treated as eventually consistent: the service keeps its own
//! in-memory copy of the deck and never reads its writes back.

mod encryption;
mod error;
pub mod events;
mod json_store;
mod memory_store;
mod note_store;

pub use encryption::{
    decrypt_value, encrypt_value, escape_plaintext, is_encrypted, unescape_plaintext, Cipher,
    ENCRYPTED_PREFIX, PLAIN_ESCAPE_PREFIX,
};
pub use error::DatabaseError;
pub use events::DomainEvent;
pub use json_store::JsonFileStore;
pub use memory_store::MemoryStore;
pub use note_store::NoteStore;
