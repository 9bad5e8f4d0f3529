//! Sidebar note tree
//!
//! A user-arranged hierarchy of note ids shown in the sidebar. The tree is a
//! view over the deck's [`NoteCollection`](crate::models::NoteCollection);
//! keeping the two consistent is the job of
//! [`reconcile_tree`](crate::services::reconcile_tree).

use serde::{Deserialize, Serialize};

/// One sidebar entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteTreeItem {
    /// Note id
    pub id: String,

    #[serde(default)]
    pub children: Vec<NoteTreeItem>,

    #[serde(default)]
    pub collapsed: bool,
}

impl NoteTreeItem {
    /// Collapsed leaf entry, the shape used for newly adopted notes
    pub fn leaf(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
            collapsed: true,
        }
    }
}

/// Ordered forest of sidebar entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteTree {
    pub items: Vec<NoteTreeItem>,
}

impl NoteTree {
    pub fn new(items: Vec<NoteTreeItem>) -> Self {
        Self { items }
    }

    /// Entry for `id` anywhere in the tree
    pub fn find(&self, id: &str) -> Option<&NoteTreeItem> {
        find_in(&self.items, id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Every id in the tree, depth-first
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_ids(&self.items, &mut out);
        out
    }

    /// Add a collapsed leaf for `id` under `parent` (or at the top level).
    ///
    /// Returns false when `id` is already present or `parent` is unknown.
    pub fn insert(&mut self, id: &str, parent: Option<&str>) -> bool {
        if self.contains(id) {
            return false;
        }
        match parent {
            None => {
                self.items.push(NoteTreeItem::leaf(id));
                true
            }
            Some(parent_id) => match find_in_mut(&mut self.items, parent_id) {
                Some(parent) => {
                    parent.children.push(NoteTreeItem::leaf(id));
                    true
                }
                None => false,
            },
        }
    }

    /// Remove the entry for `id`; its children take its place in the parent.
    pub fn remove(&mut self, id: &str) -> bool {
        remove_promoting_children(&mut self.items, id)
    }

    /// Move `id` (with its subtree) under `new_parent` at `index` (clamped).
    ///
    /// Moving an entry into its own subtree is rejected.
    pub fn move_item(&mut self, id: &str, new_parent: Option<&str>, index: usize) -> bool {
        if let Some(parent_id) = new_parent {
            let Some(item) = self.find(id) else {
                return false;
            };
            if item.id == parent_id || find_in(&item.children, parent_id).is_some() {
                return false;
            }
            if !self.contains(parent_id) {
                return false;
            }
        }
        let Some(item) = detach(&mut self.items, id) else {
            return false;
        };
        let siblings = match new_parent {
            None => &mut self.items,
            Some(parent_id) => match find_in_mut(&mut self.items, parent_id) {
                Some(parent) => &mut parent.children,
                None => return false,
            },
        };
        let index = index.min(siblings.len());
        siblings.insert(index, item);
        true
    }

    /// Flip the collapsed flag; returns the new value
    pub fn toggle_collapsed(&mut self, id: &str) -> Option<bool> {
        let item = find_in_mut(&mut self.items, id)?;
        item.collapsed = !item.collapsed;
        Some(item.collapsed)
    }
}

fn find_in<'a>(items: &'a [NoteTreeItem], id: &str) -> Option<&'a NoteTreeItem> {
    for item in items {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in(&item.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(items: &'a mut [NoteTreeItem], id: &str) -> Option<&'a mut NoteTreeItem> {
    for item in items {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_in_mut(&mut item.children, id) {
            return Some(found);
        }
    }
    None
}

fn collect_ids<'a>(items: &'a [NoteTreeItem], out: &mut Vec<&'a str>) {
    for item in items {
        out.push(&item.id);
        collect_ids(&item.children, out);
    }
}

fn detach(items: &mut Vec<NoteTreeItem>, id: &str) -> Option<NoteTreeItem> {
    if let Some(pos) = items.iter().position(|item| item.id == id) {
        return Some(items.remove(pos));
    }
    items.iter_mut().find_map(|item| detach(&mut item.children, id))
}

fn remove_promoting_children(items: &mut Vec<NoteTreeItem>, id: &str) -> bool {
    if let Some(pos) = items.iter().position(|item| item.id == id) {
        let removed = items.remove(pos);
        for (offset, child) in removed.children.into_iter().enumerate() {
            items.insert(pos + offset, child);
        }
        return true;
    }
    items
        .iter_mut()
        .any(|item| remove_promoting_children(&mut item.children, id))
}
