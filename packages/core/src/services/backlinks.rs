//! Backlink computation
//!
//! Backlinks are derived on demand from the whole collection and never
//! stored. Each call rescans every note, so callers should not invoke this in
//! tight loops; at a few thousand notes a full scan is cheap.

use crate::models::{NodePath, NoteCollection};
use crate::services::link_extraction::extract_links;
use serde::Serialize;

/// One link occurrence inside a source note
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkMatch {
    /// Path of the link element at computation time
    pub path: NodePath,
    /// Id of the link element, stable across edits
    pub link_id: String,
    /// Text of the top-level block holding the link
    pub context: String,
}

/// All links from one source note to the target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Backlink {
    /// Source note id
    pub id: String,
    pub matches: Vec<BacklinkMatch>,
}

/// Notes other than `target` that link to it, ordered by source note id.
///
/// Links with empty display text are not counted.
pub fn compute_backlinks(collection: &NoteCollection, target: &str) -> Vec<Backlink> {
    let mut backlinks = Vec::new();
    for id in collection.sorted_ids() {
        if id == target {
            continue;
        }
        let Some(note) = collection.get(id) else {
            continue;
        };
        let matches: Vec<BacklinkMatch> = extract_links(&note.content)
            .filter(|found| found.note_id() == target)
            .map(|found| BacklinkMatch {
                context: found
                    .path
                    .first()
                    .and_then(|block| note.content.children().get(*block))
                    .map(|block| block.text_content())
                    .unwrap_or_default(),
                link_id: found.link_id().to_string(),
                path: found.path,
            })
            .collect();
        if !matches.is_empty() {
            backlinks.push(Backlink {
                id: id.to_string(),
                matches,
            });
        }
    }
    backlinks
}
