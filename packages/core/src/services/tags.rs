//! Tag extraction and the deck-wide tag index

use crate::models::{Document, ElementKind, NoteCollection};
use std::collections::{BTreeMap, BTreeSet};

/// Distinct tag names in `doc`, in order of first appearance
pub fn extract_tags(doc: &Document) -> Vec<String> {
    let mut seen = BTreeSet::new();
    doc.descendants()
        .filter_map(|(_, node)| match &node.as_element()?.kind {
            ElementKind::Tag { name } if !name.is_empty() => Some(name.to_lowercase()),
            _ => None,
        })
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Tag name (lowercased) to the sorted ids of notes carrying it
pub fn tag_index(collection: &NoteCollection) -> BTreeMap<String, Vec<String>> {
    let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for id in collection.sorted_ids() {
        let Some(note) = collection.get(id) else {
            continue;
        };
        for tag in extract_tags(&note.content) {
            index.entry(tag).or_default().push(id.to_string());
        }
    }
    index
}
