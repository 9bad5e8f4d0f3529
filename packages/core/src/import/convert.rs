//! Normalized markdown AST to [`Document`]
//!
//! Every produced node gets a fresh id. Inline emphasis becomes text marks,
//! `#word` tokens in plain text become tag elements, and html that survives
//! normalization is reduced to plain text.

use super::mdast::MdNode;
use crate::models::{Document, Element, ElementKind, Node, TextRun};
use crate::operations::table_from_rows;
use crate::utils::html_to_text;
use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)#(\p{L}[\w-]*)").unwrap());

#[derive(Debug, Clone, Copy, Default)]
struct Marks {
    bold: bool,
    italic: bool,
    strikethrough: bool,
    code: bool,
}

/// Convert a normalized `Root` into a document.
///
/// An input with no convertible blocks yields [`Document::empty`].
pub fn to_document(root: &MdNode) -> Document {
    let blocks = match root {
        MdNode::Root { children } => convert_blocks(children),
        other => convert_block(other),
    };
    if blocks.is_empty() {
        Document::empty()
    } else {
        Document::new(blocks)
    }
}

fn element(kind: ElementKind, children: Vec<Node>) -> Node {
    Node::Element(Element::new(kind, children))
}

fn run(text: &str, marks: Marks) -> Node {
    Node::Text(TextRun {
        bold: marks.bold,
        italic: marks.italic,
        strikethrough: marks.strikethrough,
        code: marks.code,
        ..TextRun::new(text)
    })
}

/// Block sequence; stray inline nodes are gathered into paragraphs
fn convert_blocks(nodes: &[MdNode]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pending: Vec<&MdNode> = Vec::new();
    for node in nodes {
        if node.is_inline() && !node.is_image() {
            pending.push(node);
            continue;
        }
        if !pending.is_empty() {
            out.push(element(
                ElementKind::Paragraph,
                inline(pending.drain(..), Marks::default()),
            ));
        }
        out.extend(convert_block(node));
    }
    if !pending.is_empty() {
        out.push(element(
            ElementKind::Paragraph,
            inline(pending, Marks::default()),
        ));
    }
    out
}

fn convert_block(node: &MdNode) -> Vec<Node> {
    match node {
        MdNode::Root { children } => convert_blocks(children),
        MdNode::Paragraph { children } => {
            let image_only = children.iter().any(MdNode::is_image)
                && children
                    .iter()
                    .all(|c| c.is_image() || matches!(c, MdNode::Text { value } if value.trim().is_empty()));
            if image_only {
                children
                    .iter()
                    .filter(|c| c.is_image())
                    .flat_map(convert_block)
                    .collect()
            } else {
                vec![element(
                    ElementKind::Paragraph,
                    inline(children, Marks::default()),
                )]
            }
        }
        MdNode::Heading { depth, children } => vec![element(
            ElementKind::Heading {
                level: (*depth).clamp(1, 6),
            },
            inline(children, Marks::default()),
        )],
        MdNode::List { ordered, children } => convert_list(*ordered, children),
        MdNode::ListItem { .. } => convert_list(false, std::slice::from_ref(node)),
        MdNode::Blockquote { children } => {
            vec![element(ElementKind::BlockQuote, convert_blocks(children))]
        }
        MdNode::Code { lang, value } => vec![element(
            ElementKind::CodeBlock {
                language: lang.clone(),
            },
            vec![Node::text(value.as_str())],
        )],
        MdNode::Html { value } => {
            let text = html_to_text(value);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![element(ElementKind::Paragraph, vec![Node::text(text)])]
            }
        }
        MdNode::Image { url, alt } => vec![element(
            ElementKind::Image {
                url: url.clone(),
                caption: (!alt.is_empty()).then(|| alt.clone()),
            },
            Vec::new(),
        )],
        MdNode::ThematicBreak => vec![element(ElementKind::ThematicBreak, Vec::new())],
        MdNode::Table { children } => convert_table(children),
        MdNode::TableRow { .. } => convert_table(std::slice::from_ref(node)),
        MdNode::HtmlTable { table_rows } => {
            let rows: Vec<Vec<String>> = table_rows
                .iter()
                .map(|cells| cells.iter().map(|cell| html_to_text(cell)).collect())
                .collect();
            if rows.is_empty() {
                Vec::new()
            } else {
                vec![Node::Element(table_from_rows(&rows))]
            }
        }
        MdNode::Details { summary, children } => vec![element(
            ElementKind::Details {
                summary: html_to_text(summary),
            },
            convert_blocks(children),
        )],
        inline_node => vec![element(
            ElementKind::Paragraph,
            inline(std::iter::once(inline_node), Marks::default()),
        )],
    }
}

/// A list of only checklist items becomes consecutive check-list-item blocks
fn convert_list(ordered: bool, items: &[MdNode]) -> Vec<Node> {
    if !items.is_empty() && items.iter().all(MdNode::is_checklist_item) {
        return items
            .iter()
            .map(|item| {
                let checked = matches!(item, MdNode::ListItem { checked: Some(true), .. });
                element(
                    ElementKind::CheckListItem { checked },
                    inline(item.children(), Marks::default()),
                )
            })
            .collect();
    }

    let children = items
        .iter()
        .flat_map(|child| match child {
            MdNode::ListItem { children, .. } => vec![element(ElementKind::ListItem, item_content(children))],
            MdNode::List { ordered, children } => convert_list(*ordered, children),
            other => convert_block(other),
        })
        .collect();
    let kind = if ordered {
        ElementKind::NumberedList
    } else {
        ElementKind::BulletedList
    };
    vec![element(kind, children)]
}

fn item_content(children: &[MdNode]) -> Vec<Node> {
    if children.iter().all(MdNode::is_inline) {
        inline(children, Marks::default())
    } else {
        convert_blocks(children)
    }
}

fn convert_table(rows: &[MdNode]) -> Vec<Node> {
    let width = rows
        .iter()
        .map(|row| row.children().len())
        .max()
        .unwrap_or(0);
    if rows.is_empty() || width == 0 {
        return Vec::new();
    }
    let rows = rows
        .iter()
        .map(|row| {
            let cells = (0..width)
                .map(|i| {
                    let content = row
                        .children()
                        .get(i)
                        .map(|cell| inline(cell.children(), Marks::default()))
                        .unwrap_or_default();
                    element(ElementKind::TableCell, content)
                })
                .collect();
            element(ElementKind::TableRow, cells)
        })
        .collect();
    vec![element(ElementKind::Table, rows)]
}

fn inline<'a>(nodes: impl IntoIterator<Item = &'a MdNode>, marks: Marks) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            MdNode::Text { value } => out.extend(text_with_tags(value, marks)),
            MdNode::Emphasis { children } => out.extend(inline(
                children,
                Marks {
                    italic: true,
                    ..marks
                },
            )),
            MdNode::Strong { children } => out.extend(inline(
                children,
                Marks {
                    bold: true,
                    ..marks
                },
            )),
            MdNode::Delete { children } => out.extend(inline(
                children,
                Marks {
                    strikethrough: true,
                    ..marks
                },
            )),
            MdNode::InlineCode { value } | MdNode::Code { value, .. } => {
                out.push(run(value, Marks { code: true, ..marks }))
            }
            MdNode::Break => out.push(run("\n", marks)),
            MdNode::Link { url, children } => out.push(element(
                ElementKind::Link { url: url.clone() },
                inline(children, marks),
            )),
            MdNode::Image { .. } => out.extend(convert_block(node)),
            MdNode::Html { value } => {
                let text = html_to_text(value);
                if !text.is_empty() {
                    out.push(run(&text, marks));
                }
            }
            other => out.extend(inline(other.children(), marks)),
        }
    }
    out
}

/// Split `#word` tokens out of plain text into tag elements
fn text_with_tags(value: &str, marks: Marks) -> Vec<Node> {
    if marks.code {
        return vec![run(value, marks)];
    }
    let mut out = Vec::new();
    let mut last = 0;
    for caps in TAG_RE.captures_iter(value) {
        let Some(name) = caps.get(2) else {
            continue;
        };
        let hash = name.start() - 1;
        if hash > last {
            out.push(run(&value[last..hash], marks));
        }
        out.push(Node::Element(Element::tag(name.as_str())));
        last = name.end();
    }
    if last < value.len() || out.is_empty() {
        out.push(run(&value[last..], marks));
    }
    out
}
