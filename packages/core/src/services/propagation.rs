//! Rename and delete propagation
//!
//! Both entry points rewrite every note that links to a given note, apply the
//! rewritten content to the in-memory collection immediately, and return one
//! [`NoteUpdate`] per changed note for the caller to persist. Matches are
//! handled independently: a link that cannot be rewritten is logged and
//! skipped without affecting the others.

use crate::models::{Document, Element, ElementKind, Node, NoteCollection, NoteUpdate, TextRun};
use crate::services::backlinks::compute_backlinks;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Point every link to `note_id` at `new_title`.
///
/// Links without custom text get their visible label replaced by the new
/// title; links with custom text only have their stored title updated.
pub fn propagate_rename(
    collection: &mut NoteCollection,
    note_id: &str,
    new_title: &str,
    now: DateTime<Utc>,
) -> Vec<NoteUpdate> {
    let backlinks = compute_backlinks(collection, note_id);
    let mut updates = Vec::new();

    for backlink in backlinks {
        let Some(note) = collection.get(&backlink.id) else {
            continue;
        };
        let mut content = note.content.clone();
        let mut rewritten = 0;

        for found in &backlink.matches {
            // The recorded path is a hint; the link id is authoritative
            let path = match content.get(&found.path) {
                Some(node) if node.id() == found.link_id => Some(found.path.clone()),
                _ => content.path_of(&found.link_id),
            };
            let Some(path) = path else {
                tracing::warn!(
                    "Link {} in note {} disappeared before rename",
                    found.link_id, backlink.id
                );
                continue;
            };
            match content.update_element(&path, |link| retitle(link, new_title)) {
                Ok(()) => rewritten += 1,
                Err(e) => tracing::warn!(
                    "Failed to rename link {} in note {}: {}",
                    found.link_id, backlink.id, e
                ),
            }
        }

        if rewritten > 0 {
            let update = NoteUpdate::content(backlink.id.as_str(), content, now);
            collection.apply_update(&update);
            updates.push(update);
        }
    }

    tracing::debug!(
        "Rename of {} rewrote {} notes",
        note_id,
        updates.len()
    );
    updates
}

fn retitle(link: &mut Element, new_title: &str) {
    let ElementKind::NoteLink {
        note_title,
        custom_text,
        ..
    } = &mut link.kind
    else {
        return;
    };
    *note_title = new_title.to_string();
    if custom_text.is_some() {
        return;
    }
    // Keep the label's id and marks
    let label = match link.children.iter().find_map(Node::as_text) {
        Some(run) => TextRun {
            text: new_title.to_string(),
            ..run.clone()
        },
        None => TextRun::new(new_title),
    };
    link.children = vec![Node::Text(label)];
}

/// Unwrap every link to `note_id` in the other notes, leaving their text behind.
///
/// Empty stub links to the note are unwrapped too, so afterwards no note
/// link to `note_id` remains anywhere outside the note itself.
pub fn propagate_delete(
    collection: &mut NoteCollection,
    note_id: &str,
    now: DateTime<Utc>,
) -> Vec<NoteUpdate> {
    let visible = compute_backlinks(collection, note_id)
        .iter()
        .map(|b| b.matches.len())
        .sum::<usize>();

    let updates = rewrite_notes(collection, now, |id, content| {
        if id == note_id {
            return 0;
        }
        unwrap_links_where(content, |link| link.linked_note_id() == Some(note_id))
    });

    tracing::debug!(
        "Delete of {} unwrapped {} visible links across {} notes",
        note_id,
        visible,
        updates.len()
    );
    updates
}

/// Unwrap note links whose target is not in the collection.
///
/// Repair pass for propagation that only partially persisted. Never run
/// implicitly.
pub fn sweep_dangling_links(collection: &mut NoteCollection, now: DateTime<Utc>) -> Vec<NoteUpdate> {
    let existing: HashSet<String> = collection.sorted_ids().into_iter().map(String::from).collect();
    let updates = rewrite_notes(collection, now, |_, content| {
        unwrap_links_where(content, |link| {
            link.linked_note_id()
                .is_some_and(|target| !existing.contains(target))
        })
    });
    if !updates.is_empty() {
        tracing::debug!("Dangling link sweep rewrote {} notes", updates.len());
    }
    updates
}

/// Apply `edit` to a copy of every note's content; notes where it reports
/// changes get the copy applied and a payload emitted
fn rewrite_notes<F>(collection: &mut NoteCollection, now: DateTime<Utc>, mut edit: F) -> Vec<NoteUpdate>
where
    F: FnMut(&str, &mut Document) -> usize,
{
    let ids: Vec<String> = collection.sorted_ids().into_iter().map(String::from).collect();
    let mut updates = Vec::new();
    for id in ids {
        let Some(note) = collection.get(&id) else {
            continue;
        };
        let mut content = note.content.clone();
        if edit(&id, &mut content) == 0 {
            continue;
        }
        let update = NoteUpdate::content(id, content, now);
        collection.apply_update(&update);
        updates.push(update);
    }
    updates
}

/// Unwrap matching note links, last first so earlier paths stay valid
fn unwrap_links_where<P>(content: &mut Document, predicate: P) -> usize
where
    P: Fn(&Element) -> bool,
{
    let paths: Vec<_> = content
        .find(&[], |node| node.as_element().is_some_and(&predicate))
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    paths
        .iter()
        .rev()
        .filter(|path| content.unwrap_node(path))
        .count()
}
