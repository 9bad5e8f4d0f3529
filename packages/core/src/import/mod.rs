//! Markdown Import
//!
//! One-shot ingestion path from markdown text to a [`Document`]:
//! [`parse_markdown`] builds a generic [`MdNode`] tree, [`normalize`] reshapes
//! it to fit the document schema, and [`to_document`] converts it with fresh
//! node ids.
//!
//! # Examples
//!
//! ```rust
//! use decknote_core::import::import_markdown;
//!
//! let doc = import_markdown("# Groceries\n\n- [ ] milk\n- [x] eggs\n");
//! assert_eq!(doc.children().len(), 3);
//! assert_eq!(doc.plain_text(), "Groceries\nmilk\neggs");
//! ```
//!
//! Malformed constructs (unterminated `<details>`, stray html) are passed
//! through best-effort; import never fails on content.

mod convert;
mod mdast;
mod normalize;
mod parser;

pub use convert::to_document;
pub use mdast::MdNode;
pub use normalize::{
    fold_details, fold_html_tables, normalize, normalize_lists, split_checklists, split_images,
};
pub use parser::parse_markdown;

use crate::models::Document;

/// Parse, normalize and convert markdown text
pub fn import_markdown(text: &str) -> Document {
    let root = normalize(parse_markdown(text));
    to_document(&root)
}
