//! Document Operations
//!
//! Structural query and transform primitives over [`Document`](crate::models::Document).
//! Every edit made by higher layers (link propagation, import, table editing)
//! goes through the methods defined here so node ids stay stable and the tree
//! stays well-formed.
//!
//! - transforms: find, wrap a range, unwrap, insert/remove, element updates
//! - table: rectangular row/column edits and table splitting

mod error;
mod table;
mod transforms;

pub use error::TransformError;
pub use table::{table_from_rows, TableRemoval};
