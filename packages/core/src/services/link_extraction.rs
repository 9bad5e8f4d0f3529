//! Note link discovery
//!
//! [`extract_links`] is the single primitive backlinks, propagation and the
//! graph are built on. It walks a document lazily in document order and
//! yields every note link with visible text, together with its path.

use crate::models::{Descendants, Document, Element, NodePath};

/// A note link found in a document
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMatch<'a> {
    pub element: &'a Element,
    pub path: NodePath,
}

impl<'a> LinkMatch<'a> {
    /// Target note id
    pub fn note_id(&self) -> &'a str {
        self.element.linked_note_id().unwrap_or_default()
    }

    /// Id of the link element itself
    pub fn link_id(&self) -> &'a str {
        &self.element.id
    }
}

/// Lazy iterator returned by [`extract_links`]; clone it to restart from the
/// same position
#[derive(Clone)]
pub struct Links<'a> {
    inner: Descendants<'a>,
}

impl<'a> Iterator for Links<'a> {
    type Item = LinkMatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for (path, node) in self.inner.by_ref() {
            let Some(element) = node.as_element() else {
                continue;
            };
            if element.linked_note_id().is_some() && has_display_text(element) {
                return Some(LinkMatch { element, path });
            }
        }
        None
    }
}

/// Every note link in `doc` with non-empty display text, in document order
pub fn extract_links(doc: &Document) -> Links<'_> {
    Links {
        inner: doc.descendants(),
    }
}

/// Links with empty display text are stubs and are not counted as references.
/// Whitespace still counts as text.
pub(crate) fn has_display_text(element: &Element) -> bool {
    !element.text_content().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Element, Node};

    fn stub_link(note_id: &str) -> Element {
        let mut link = Element::note_link(note_id, "Target");
        link.children = vec![Node::text("")];
        link
    }

    fn sample() -> Document {
        Document::new(vec![
            Node::Element(Element::paragraph(vec![
                Node::text("See "),
                Node::Element(Element::note_link("b", "Beta")),
                Node::text(" and "),
                Node::Element(stub_link("c")),
            ])),
            Node::Element(Element::paragraph(vec![Node::Element(
                Element::note_link_with_text("c", "Gamma", "the third one"),
            )])),
        ])
    }

    #[test]
    fn test_extract_links_in_document_order() {
        let doc = sample();
        let found: Vec<(String, NodePath)> = extract_links(&doc)
            .map(|m| (m.note_id().to_string(), m.path))
            .collect();
        assert_eq!(
            found,
            vec![("b".to_string(), vec![0, 1]), ("c".to_string(), vec![1, 0])]
        );
    }

    #[test]
    fn test_empty_display_text_is_skipped() {
        let doc = Document::new(vec![Node::Element(Element::paragraph(vec![
            Node::Element(stub_link("x")),
        ]))]);
        assert_eq!(extract_links(&doc).count(), 0);
    }

    #[test]
    fn test_whitespace_display_text_is_kept() {
        let mut link = Element::note_link("x", "X");
        link.children = vec![Node::text(" ")];
        let doc = Document::new(vec![Node::Element(Element::paragraph(vec![
            Node::Element(link),
        ]))]);
        let found: Vec<_> = extract_links(&doc).map(|m| m.path).collect();
        assert_eq!(found, vec![vec![0, 0]]);
    }

    #[test]
    fn test_links_are_restartable() {
        let doc = sample();
        let mut links = extract_links(&doc);
        let checkpoint = links.clone();
        assert_eq!(links.by_ref().count(), 2);
        assert_eq!(links.next(), None);
        assert_eq!(checkpoint.count(), 2);
        assert_eq!(extract_links(&doc).count(), 2);
    }

    #[test]
    fn test_link_ids_point_back_into_document() {
        let doc = sample();
        for found in extract_links(&doc) {
            assert_eq!(doc.get(&found.path).unwrap().id(), found.link_id());
        }
    }
}
