//! Utility functions for Decknote Core
//!
//! This module provides common utility functions used across the codebase.

mod html;
mod id;

pub use html::html_to_text;
pub use id::generate_id;
