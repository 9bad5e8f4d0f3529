//! Markdown AST normalization
//!
//! Reshapes a generic markdown tree so it maps one-to-one onto the document
//! tree schema. Passes run in a fixed order, each over the whole tree, and
//! each relies on the shape left by the previous one:
//!
//! 1. lists: nested lists are lifted out of their list item to become the
//!    item's next sibling; paragraph/heading wrappers inside items are removed
//! 2. checklists: a list is split into runs of checklist items and runs of
//!    everything else
//! 3. images: text blocks mixing images and text are split around each image
//! 4. details: `<details><summary>` html, a content block and a closing
//!    `</details>` html fold into one `Details` node
//! 5. html tables: raw `<table>` html becomes an `HtmlTable` of cell html
//!
//! Every pass keeps document order and never drops a node it does not replace.

use super::mdast::MdNode;
use regex::Regex;
use std::sync::LazyLock;

static DETAILS_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<details[^>]*>\s*<summary[^>]*>(.*?)</summary>").unwrap());

static DETAILS_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*</details>").unwrap());

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table[^>]*>.*</table>").unwrap());

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());

static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").unwrap());

/// Run every pass over `root`, in order
pub fn normalize(root: MdNode) -> MdNode {
    let root = normalize_lists(root);
    let root = split_checklists(root);
    let root = split_images(root);
    let root = fold_details(root);
    fold_html_tables(root)
}

/// Rebuild `node`'s children with `f`, which maps one child to zero or more replacements
fn map_children<F>(mut node: MdNode, f: F) -> MdNode
where
    F: Fn(MdNode) -> Vec<MdNode>,
{
    let children = node.take_children();
    if let Some(slot) = node.children_mut() {
        *slot = children.into_iter().flat_map(f).collect();
    }
    node
}

/// Pass 1: lift nested lists and unwrap text blocks inside list items
pub fn normalize_lists(node: MdNode) -> MdNode {
    let node = map_children(node, |child| vec![normalize_lists(child)]);
    match node {
        MdNode::List { ordered, children } => MdNode::List {
            ordered,
            children: children.into_iter().flat_map(lift_from_item).collect(),
        },
        other => other,
    }
}

/// Split a (normalized) list item into the item itself followed by any lists it contained
fn lift_from_item(item: MdNode) -> Vec<MdNode> {
    let MdNode::ListItem { checked, children } = item else {
        return vec![item];
    };
    let mut kept = Vec::new();
    let mut lifted = Vec::new();
    for child in children {
        match child {
            MdNode::List { .. } => lifted.push(child),
            MdNode::Paragraph { children } | MdNode::Heading { children, .. } => {
                kept.extend(children)
            }
            other => kept.push(other),
        }
    }
    let mut out = vec![MdNode::ListItem {
        checked,
        children: kept,
    }];
    out.extend(lifted);
    out
}

/// Pass 2: split lists into runs of checklist items vs everything else
pub fn split_checklists(node: MdNode) -> MdNode {
    map_children(node, split_checklists_in)
}

fn split_checklists_in(node: MdNode) -> Vec<MdNode> {
    let node = split_checklists(node);
    let MdNode::List { ordered, children } = node else {
        return vec![node];
    };

    let mut runs: Vec<(bool, Vec<MdNode>)> = Vec::new();
    for child in children {
        let is_check = child.is_checklist_item();
        match runs.last_mut() {
            Some((run_is_check, run)) if *run_is_check == is_check => run.push(child),
            _ => runs.push((is_check, vec![child])),
        }
    }
    if runs.is_empty() {
        return vec![MdNode::List {
            ordered,
            children: Vec::new(),
        }];
    }
    runs.into_iter()
        .map(|(_, children)| MdNode::List { ordered, children })
        .collect()
}

/// Pass 3: split paragraphs and headings that mix images with text
pub fn split_images(node: MdNode) -> MdNode {
    if matches!(node, MdNode::ListItem { .. }) {
        return node;
    }
    map_children(node, split_images_in)
}

fn split_images_in(node: MdNode) -> Vec<MdNode> {
    match node {
        MdNode::Paragraph { children } => split_around_images(children, |children| {
            MdNode::Paragraph { children }
        }),
        MdNode::Heading { depth, children } => {
            split_around_images(children, move |children| MdNode::Heading { depth, children })
        }
        other => vec![split_images(other)],
    }
}

fn split_around_images<F>(children: Vec<MdNode>, rebuild: F) -> Vec<MdNode>
where
    F: Fn(Vec<MdNode>) -> MdNode,
{
    let has_image = children.iter().any(MdNode::is_image);
    let only_images = children
        .iter()
        .all(|child| child.is_image() || is_blank_text(child));
    if !has_image || only_images {
        return vec![rebuild(children)];
    }

    let mut out = Vec::new();
    let mut run = Vec::new();
    for child in children {
        if child.is_image() {
            if !run.is_empty() {
                out.push(rebuild(std::mem::take(&mut run)));
            }
            out.push(child);
        } else {
            run.push(child);
        }
    }
    if !run.is_empty() {
        out.push(rebuild(run));
    }
    out
}

fn is_blank_text(node: &MdNode) -> bool {
    matches!(node, MdNode::Text { value } if value.trim().is_empty())
}

/// Pass 4: fold `<details>` html sequences
pub fn fold_details(node: MdNode) -> MdNode {
    let mut node = map_children(node, |child| vec![fold_details(child)]);
    let children = node.take_children();
    if let Some(slot) = node.children_mut() {
        *slot = fold_details_in(children);
    }
    node
}

fn fold_details_in(children: Vec<MdNode>) -> Vec<MdNode> {
    let mut out = Vec::with_capacity(children.len());
    let mut iter = children.into_iter().peekable();
    while let Some(node) = iter.next() {
        let summary = match &node {
            MdNode::Html { value } => DETAILS_OPEN_RE
                .captures(value)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string()),
            _ => None,
        };
        let Some(summary) = summary else {
            out.push(node);
            continue;
        };

        // Need [open, content, close]; otherwise pass the open tag through
        let content_ok = matches!(iter.peek(), Some(next) if !matches!(next, MdNode::Html { .. }));
        if !content_ok {
            out.push(node);
            continue;
        }
        let Some(mut content) = iter.next() else {
            out.push(node);
            continue;
        };
        let closes = matches!(iter.peek(), Some(MdNode::Html { value }) if DETAILS_CLOSE_RE.is_match(value));
        if !closes {
            out.push(node);
            out.push(content);
            continue;
        }
        iter.next();

        let children = match content.children_mut() {
            Some(_) => content.take_children(),
            None => vec![content],
        };
        out.push(MdNode::Details { summary, children });
    }
    out
}

/// Pass 5: parse raw html tables into rows of cell html
pub fn fold_html_tables(node: MdNode) -> MdNode {
    map_children(node, |child| match child {
        MdNode::Html { value } => vec![html_table(&value).unwrap_or(MdNode::Html { value })],
        other => vec![fold_html_tables(other)],
    })
}

fn html_table(html: &str) -> Option<MdNode> {
    let table = TABLE_RE.find(html)?;
    let table_rows: Vec<Vec<String>> = ROW_RE
        .captures_iter(table.as_str())
        .filter_map(|row| row.get(1))
        .map(|row| {
            CELL_RE
                .captures_iter(row.as_str())
                .filter_map(|cell| cell.get(1))
                .map(|cell| cell.as_str().trim().to_string())
                .collect()
        })
        .collect();
    if table_rows.is_empty() {
        return None;
    }
    Some(MdNode::HtmlTable { table_rows })
}
