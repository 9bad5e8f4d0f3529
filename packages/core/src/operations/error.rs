//! Error types for document tree transforms
//!
//! Every structural edit goes through the primitives in
//! [`crate::operations`]; these errors describe why an edit was refused.
//! A refused edit leaves the document unchanged.

use crate::models::NodePath;
use thiserror::Error;

/// Errors raised by document transforms
///
/// # Examples
///
/// ```rust
/// use decknote_core::operations::TransformError;
///
/// let err = TransformError::node_not_found(vec![0, 2]);
/// assert_eq!(err.to_string(), "No node at path [0, 2]");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Path does not resolve to a node
    #[error("No node at path {path:?}")]
    NodeNotFound { path: NodePath },

    /// Path resolves to a text leaf where an element was required
    #[error("Node at path {path:?} is not an element")]
    NotAnElement { path: NodePath },

    /// Path resolves to an element where a text leaf was required
    #[error("Node at path {path:?} is not a text leaf")]
    NotATextLeaf { path: NodePath },

    /// Range endpoints live under different parents
    #[error("Range endpoints {start:?} and {end:?} do not share a parent")]
    RangeSpansParents { start: NodePath, end: NodePath },

    /// Range selects no content
    #[error("Range is empty")]
    EmptyRange,

    /// Offset past the end of a text leaf
    #[error("Offset {offset} is out of bounds for text of length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// Element expected to be of a specific kind
    #[error("Expected {expected} at path {path:?}, found {found}")]
    UnexpectedKind {
        path: NodePath,
        expected: &'static str,
        found: &'static str,
    },

    /// Table structure would be broken by the edit
    #[error("Invalid table edit: {reason}")]
    InvalidTable { reason: String },

    /// Edit would leave an element without children
    #[error("Edit would leave element '{id}' without children")]
    EmptyChildren { id: String },
}

impl TransformError {
    pub fn node_not_found(path: impl Into<NodePath>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    pub fn not_an_element(path: impl Into<NodePath>) -> Self {
        Self::NotAnElement { path: path.into() }
    }

    pub fn not_a_text_leaf(path: impl Into<NodePath>) -> Self {
        Self::NotATextLeaf { path: path.into() }
    }

    pub fn invalid_table(reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            reason: reason.into(),
        }
    }
}
