//! Sidebar tree reconciliation
//!
//! Keeps the [`NoteTree`] and the [`NoteCollection`] in step: every tree id
//! exists in the collection and every note appears in the tree exactly once.
//! The tree is rebuilt bottom-up rather than edited while iterating.

use crate::models::{NoteCollection, NoteTree, NoteTreeItem};
use std::collections::HashSet;

/// Reconciled copy of `tree`.
///
/// Entries for missing notes are dropped together with their subtrees (any
/// surviving notes below them are re-adopted), repeated ids keep only their
/// first occurrence, then notes absent from the tree are appended as
/// collapsed top-level leaves, oldest first.
pub fn reconciled(tree: &NoteTree, collection: &NoteCollection) -> NoteTree {
    let mut seen = HashSet::new();
    let mut items = prune(&tree.items, collection, &mut seen);

    let mut orphans: Vec<_> = collection
        .iter()
        .filter(|note| !seen.contains(note.id.as_str()))
        .collect();
    orphans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    items.extend(orphans.into_iter().map(|note| NoteTreeItem::leaf(note.id.as_str())));

    NoteTree::new(items)
}

fn prune<'a>(
    items: &'a [NoteTreeItem],
    collection: &NoteCollection,
    seen: &mut HashSet<&'a str>,
) -> Vec<NoteTreeItem> {
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if !collection.contains(&item.id) || !seen.insert(item.id.as_str()) {
            continue;
        }
        kept.push(NoteTreeItem {
            id: item.id.clone(),
            children: prune(&item.children, collection, seen),
            collapsed: item.collapsed,
        });
    }
    kept
}

/// Reconcile `tree` in place; returns whether anything changed
pub fn reconcile_tree(tree: &mut NoteTree, collection: &NoteCollection) -> bool {
    let next = reconciled(tree, collection);
    if next == *tree {
        return false;
    }
    tracing::info!(
        "Reconciled note tree: {} entries before, {} after",
        tree.ids().len(),
        next.ids().len()
    );
    *tree = next;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Note};
    use chrono::{Duration, Utc};

    fn item(id: &str, children: Vec<NoteTreeItem>) -> NoteTreeItem {
        NoteTreeItem {
            id: id.to_string(),
            children,
            collapsed: false,
        }
    }

    fn notes(ids: &[&str]) -> NoteCollection {
        let start = Utc::now();
        ids.iter()
            .enumerate()
            .map(|(i, id)| Note::with_id(*id, id.to_uppercase(), Document::empty(), start + Duration::seconds(i as i64)))
            .collect()
    }

    fn sorted_ids(tree: &NoteTree) -> Vec<&str> {
        let mut ids = tree.ids();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_prune_then_adopt() {
        let mut tree = NoteTree::new(vec![item("a", vec![item("b", vec![])])]);
        let changed = reconcile_tree(&mut tree, &notes(&["a", "c"]));

        assert!(changed);
        assert_eq!(tree.items.len(), 2);
        assert_eq!(tree.items[0].id, "a");
        assert!(tree.items[0].children.is_empty());
        assert_eq!(tree.items[1], NoteTreeItem::leaf("c"));
    }

    #[test]
    fn test_consecutive_orphans_are_all_pruned() {
        let mut tree = NoteTree::new(vec![
            item("x", vec![]),
            item("y", vec![]),
            item("a", vec![item("z1", vec![]), item("z2", vec![]), item("b", vec![])]),
        ]);
        reconcile_tree(&mut tree, &notes(&["a", "b"]));
        assert_eq!(tree, NoteTree::new(vec![item("a", vec![item("b", vec![])])]));
    }

    #[test]
    fn test_children_of_pruned_entries_are_readopted() {
        let mut tree = NoteTree::new(vec![item("gone", vec![item("kept", vec![])])]);
        reconcile_tree(&mut tree, &notes(&["kept"]));
        assert_eq!(tree.items, vec![NoteTreeItem::leaf("kept")]);
    }

    #[test]
    fn test_duplicate_entries_collapse_to_first() {
        let mut tree = NoteTree::new(vec![item("a", vec![item("b", vec![])]), item("b", vec![])]);
        reconcile_tree(&mut tree, &notes(&["a", "b"]));
        assert_eq!(tree.ids(), vec!["a", "b"]);
        assert_eq!(tree.items.len(), 1);
    }

    #[test]
    fn test_ids_match_collection_exactly() {
        let collection = notes(&["n1", "n2", "n3", "n4"]);
        let mut tree = NoteTree::new(vec![item("n3", vec![item("old", vec![])]), item("n3", vec![])]);
        reconcile_tree(&mut tree, &collection);
        assert_eq!(sorted_ids(&tree), vec!["n1", "n2", "n3", "n4"]);
        // Orphans adopted oldest first
        assert_eq!(tree.ids(), vec!["n3", "n1", "n2", "n4"]);
    }

    #[test]
    fn test_already_consistent_tree_is_unchanged() {
        let mut tree = NoteTree::new(vec![item("a", vec![item("b", vec![])])]);
        assert!(!reconcile_tree(&mut tree, &notes(&["a", "b"])));
        assert!(!tree.items[0].collapsed);
    }
}
