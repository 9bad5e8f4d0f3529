//! Query and transform primitives over a [`Document`]
//!
//! These are the only mutation paths for a document tree. Each one keeps node
//! ids stable (only freshly split fragments get new ids) and keeps the tree
//! well-formed: elements never end up with an empty `children` vector.

use crate::models::{Descendants, Document, Element, Node, NodePath, TextRange};
use crate::operations::error::TransformError;

impl Document {
    /// Mutable node at `path`
    pub(crate) fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = match node {
                Node::Element(el) => el.children.get_mut(*index)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// Children vector of the element at `parent` (the empty path is the document root)
    pub(crate) fn children_at_mut(
        &mut self,
        parent: &[usize],
    ) -> Result<&mut Vec<Node>, TransformError> {
        if parent.is_empty() {
            return Ok(&mut self.children);
        }
        match self.get_mut(parent) {
            Some(Node::Element(el)) => Ok(&mut el.children),
            Some(Node::Text(_)) => Err(TransformError::not_an_element(parent)),
            None => Err(TransformError::node_not_found(parent)),
        }
    }

    /// Nodes at or under `at` matching `predicate`, in document order.
    ///
    /// An empty `at` searches the whole document.
    pub fn find<F>(&self, at: &[usize], predicate: F) -> Vec<(NodePath, &Node)>
    where
        F: Fn(&Node) -> bool,
    {
        if at.is_empty() {
            return self
                .descendants()
                .filter(|(_, node)| predicate(node))
                .collect();
        }
        let Some(root) = self.get(at) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if predicate(root) {
            found.push((at.to_vec(), root));
        }
        found.extend(
            Descendants::new(root.children(), at.to_vec()).filter(|(_, node)| predicate(node)),
        );
        found
    }

    /// Insert `node` so that it ends up at `path`
    pub fn insert_node(&mut self, path: &[usize], node: Node) -> Result<(), TransformError> {
        let (index, parent) = path
            .split_last()
            .ok_or_else(|| TransformError::node_not_found(path))?;
        let children = self.children_at_mut(parent)?;
        if *index > children.len() {
            return Err(TransformError::node_not_found(path));
        }
        children.insert(*index, node);
        Ok(())
    }

    /// Remove and return the node at `path`
    pub fn remove_node(&mut self, path: &[usize]) -> Result<Node, TransformError> {
        let (index, parent) = path
            .split_last()
            .ok_or_else(|| TransformError::node_not_found(path))?;
        let children = self.children_at_mut(parent)?;
        if *index >= children.len() {
            return Err(TransformError::node_not_found(path));
        }
        let removed = children.remove(*index);
        if children.is_empty() && !parent.is_empty() {
            children.push(Node::text(""));
        }
        Ok(removed)
    }

    /// Remove the children of `parent` in `range`
    pub fn remove_nodes(
        &mut self,
        parent: &[usize],
        range: std::ops::Range<usize>,
    ) -> Result<Vec<Node>, TransformError> {
        let children = self.children_at_mut(parent)?;
        if range.start > range.end || range.end > children.len() {
            let mut path = parent.to_vec();
            path.push(range.end);
            return Err(TransformError::node_not_found(path));
        }
        let removed: Vec<Node> = children.drain(range).collect();
        if children.is_empty() && !parent.is_empty() {
            children.push(Node::text(""));
        }
        Ok(removed)
    }

    /// Remove the element at `path`, splicing its children into its parent at
    /// the same position. No-op (returns false) if there is no element there.
    ///
    /// At the document root, children that include text are kept together
    /// in a new paragraph so no text run ends up directly under the root.
    pub fn unwrap_node(&mut self, path: &[usize]) -> bool {
        let Some((index, parent)) = path.split_last() else {
            return false;
        };
        let Ok(children) = self.children_at_mut(parent) else {
            return false;
        };
        if !matches!(children.get(*index), Some(Node::Element(_))) {
            return false;
        }
        if let Node::Element(el) = children.remove(*index) {
            if parent.is_empty() && el.children.iter().any(|c| c.as_text().is_some()) {
                children.insert(*index, Node::Element(Element::paragraph(el.children)));
            } else {
                children.splice(*index..*index, el.children);
            }
        }
        true
    }

    /// Apply `edit` to the element at `path`.
    ///
    /// The element keeps its id. An edit that empties `children` is rolled
    /// back and reported.
    pub fn update_element<F>(&mut self, path: &[usize], edit: F) -> Result<(), TransformError>
    where
        F: FnOnce(&mut Element),
    {
        let node = self
            .get_mut(path)
            .ok_or_else(|| TransformError::node_not_found(path))?;
        let Node::Element(el) = node else {
            return Err(TransformError::not_an_element(path));
        };
        let backup = el.clone();
        edit(el);
        el.id = backup.id.clone();
        if el.children.is_empty() {
            let id = backup.id.clone();
            *el = backup;
            return Err(TransformError::EmptyChildren { id });
        }
        Ok(())
    }

    /// Wrap the content between the range endpoints in `wrapper`.
    ///
    /// Both endpoints must be text leaves under the same parent. Leaves that
    /// straddle an endpoint are split so the wrapper's boundary falls exactly
    /// on node boundaries; the left fragment keeps the original id, the right
    /// fragment gets a fresh one. Returns the wrapper's path.
    pub fn wrap_range(
        &mut self,
        range: &TextRange,
        mut wrapper: Element,
    ) -> Result<NodePath, TransformError> {
        let (start, end) = range.ordered();
        let (start_index, start_parent) = start
            .path
            .split_last()
            .ok_or_else(|| TransformError::node_not_found(start.path.clone()))?;
        let (end_index, end_parent) = end
            .path
            .split_last()
            .ok_or_else(|| TransformError::node_not_found(end.path.clone()))?;
        if start_parent != end_parent {
            return Err(TransformError::RangeSpansParents {
                start: start.path.clone(),
                end: end.path.clone(),
            });
        }

        let start_len = self.text_len(&start.path)?;
        let end_len = self.text_len(&end.path)?;
        for (offset, len) in [(start.offset, start_len), (end.offset, end_len)] {
            if offset > len {
                return Err(TransformError::OffsetOutOfBounds { offset, len });
            }
        }

        if start == end {
            return Err(TransformError::EmptyRange);
        }

        // Work out the selected child span before touching the tree
        let split_end = end.offset > 0 && end.offset < end_len;
        let mut last_exclusive = if end.offset == 0 {
            *end_index
        } else {
            end_index + 1
        };
        let split_start = start.offset > 0 && start.offset < start_len;
        let mut first = if start.offset == start_len {
            start_index + 1
        } else {
            *start_index
        };
        if first >= last_exclusive {
            return Err(TransformError::EmptyRange);
        }

        let parent = start_parent.to_vec();
        let children = self.children_at_mut(&parent)?;
        if split_end {
            split_text(children, *end_index, end.offset);
        }
        if split_start {
            split_text(children, *start_index, start.offset);
            first += 1;
            last_exclusive += 1;
        }

        wrapper.children = children.drain(first..last_exclusive).collect();
        children.insert(first, Node::Element(wrapper));

        let mut path = parent;
        path.push(first);
        Ok(path)
    }

    fn text_len(&self, path: &[usize]) -> Result<usize, TransformError> {
        match self.get(path) {
            Some(Node::Text(run)) => Ok(run.char_len()),
            Some(Node::Element(_)) => Err(TransformError::not_a_text_leaf(path)),
            None => Err(TransformError::node_not_found(path)),
        }
    }
}

/// Split the text leaf at `index` at character `offset`; the right half is
/// inserted after it with a fresh id
fn split_text(children: &mut Vec<Node>, index: usize, offset: usize) {
    let fragment = match children.get_mut(index) {
        Some(Node::Text(run)) => {
            let byte = run
                .text
                .char_indices()
                .nth(offset)
                .map(|(byte, _)| byte)
                .unwrap_or(run.text.len());
            let right = run.text.split_off(byte);
            run.fragment(right)
        }
        _ => return,
    };
    children.insert(index + 1, Node::Text(fragment));
}
