//! HTML fragment flattening for imported table cells
//!
//! Markdown imports can carry raw `<table>` blocks whose cells hold inline
//! HTML. The document tree stores plain text runs, so cell HTML is reduced
//! to text here.

use regex::Regex;
use std::sync::LazyLock;

/// Line breaks inside cells become spaces
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Any remaining tag is dropped, keeping its inner text
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Entities decoded after tag removal, `&amp;` last so it cannot create new entities
const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Reduce an HTML fragment to its visible text
///
/// # Examples
///
/// ```
/// use decknote_core::utils::html_to_text;
///
/// assert_eq!(html_to_text("<b>Bold</b> cell"), "Bold cell");
/// assert_eq!(html_to_text("a<br/>b"), "a b");
/// assert_eq!(html_to_text("Fish &amp; Chips"), "Fish & Chips");
/// ```
pub fn html_to_text(html: &str) -> String {
    let text = BREAK_RE.replace_all(html, " ");
    let mut text = TAG_RE.replace_all(&text, "").to_string();
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_nested_tags() {
        assert_eq!(
            html_to_text("<p><a href=\"x\"><em>link</em></a> text</p>"),
            "link text"
        );
    }

    #[test]
    fn test_entities_decoded_once() {
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
        assert_eq!(html_to_text("1 &lt; 2"), "1 < 2");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(html_to_text("  a \n\t b  "), "a b");
        assert_eq!(html_to_text(""), "");
    }
}
