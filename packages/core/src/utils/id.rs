//! Identifier generation
//!
//! Notes and document nodes both draw ids from here. Ids are UUID v4 strings,
//! globally unique, and never reused within a note's lifetime.

use uuid::Uuid;

/// Generate a fresh globally-unique identifier
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
