//! Document Tree Model
//!
//! This module defines the typed tree that every note's content is stored as.
//!
//! # Architecture
//!
//! - **Closed node kinds**: block and inline elements are variants of
//!   [`ElementKind`]; leaves are [`TextRun`]s carrying formatting marks
//! - **Stable identity**: every node (element or text leaf) owns an `id` that
//!   survives edits and persistence; backlink tracking and table correlation
//!   key off this id, never off structural position
//! - **Serialized shape**: a [`Document`] serializes as a JSON array of nodes,
//!   elements carry a kebab-case `type` discriminator, text leaves a `text` field
//!
//! # Examples
//!
//! ```rust
//! use decknote_core::models::{Document, Element, Node};
//!
//! let doc = Document::new(vec![Node::Element(Element::paragraph(vec![
//!     Node::text("See "),
//!     Node::Element(Element::note_link("note-2", "Beta")),
//! ]))]);
//!
//! assert_eq!(doc.plain_text(), "See Beta");
//! ```
//!
//! Structural mutation lives in [`crate::operations`]; this module only
//! exposes read access to a document's internals.

use crate::utils::generate_id;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Index path from the document root to a node (`[block, child, grandchild, ...]`)
pub type NodePath = Vec<usize>;

/// Validation errors for notes and documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("A note titled '{title}' already exists in this deck")]
    DuplicateTitle { title: String },

    #[error("Element '{id}' has no children")]
    EmptyChildren { id: String },

    #[error("Node id '{id}' is used more than once")]
    DuplicateNodeId { id: String },

    #[error("Text '{id}' sits directly under the document root")]
    TextAtRoot { id: String },
}

/// Any node in a document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Leaf text run
    Text(TextRun),
    /// Block or inline element with children
    Element(Element),
}

/// Leaf text run with formatting marks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default = "generate_id")]
    pub id: String,

    pub text: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Element node: a kind plus ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default = "generate_id")]
    pub id: String,

    #[serde(flatten)]
    pub kind: ElementKind,

    pub children: Vec<Node>,
}

/// Closed set of element kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    BulletedList,
    NumberedList,
    ListItem,
    CheckListItem {
        checked: bool,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Link {
        url: String,
    },
    /// Reference to another note in the same deck.
    ///
    /// `note_title` mirrors the target's current title. When `custom_text` is
    /// set the children hold that text and the title is metadata only.
    #[serde(rename_all = "camelCase")]
    NoteLink {
        note_id: String,
        note_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_text: Option<String>,
    },
    /// `name` excludes the leading `#`; the children text includes it
    Tag {
        name: String,
    },
    Table,
    TableRow,
    TableCell,
    Details {
        summary: String,
    },
    ThematicBreak,
}

impl ElementKind {
    /// Inline kinds live inside text-bearing blocks
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            ElementKind::Link { .. } | ElementKind::NoteLink { .. } | ElementKind::Tag { .. }
        )
    }

    /// Void kinds render no text of their own; they still carry one empty text child
    pub fn is_void(&self) -> bool {
        matches!(self, ElementKind::Image { .. } | ElementKind::ThematicBreak)
    }

    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Heading { .. } => "heading",
            ElementKind::BlockQuote => "block-quote",
            ElementKind::CodeBlock { .. } => "code-block",
            ElementKind::BulletedList => "bulleted-list",
            ElementKind::NumberedList => "numbered-list",
            ElementKind::ListItem => "list-item",
            ElementKind::CheckListItem { .. } => "check-list-item",
            ElementKind::Image { .. } => "image",
            ElementKind::Link { .. } => "link",
            ElementKind::NoteLink { .. } => "note-link",
            ElementKind::Tag { .. } => "tag",
            ElementKind::Table => "table",
            ElementKind::TableRow => "table-row",
            ElementKind::TableCell => "table-cell",
            ElementKind::Details { .. } => "details",
            ElementKind::ThematicBreak => "thematic-break",
        }
    }
}

impl TextRun {
    /// Create a plain text run with a fresh id
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            text: text.into(),
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            code: false,
        }
    }

    /// Copy of this run's marks around different text, with a fresh id
    pub fn fragment(&self, text: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            text: text.into(),
            ..self.clone()
        }
    }

    /// Length in characters (offsets into text runs are character offsets)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl Element {
    /// Create an element with a fresh id.
    ///
    /// An empty `children` vector is replaced by a single empty text run so the
    /// element is well-formed.
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self::with_id(generate_id(), kind, children)
    }

    /// Create an element with an explicit id
    pub fn with_id(id: impl Into<String>, kind: ElementKind, mut children: Vec<Node>) -> Self {
        if children.is_empty() {
            children.push(Node::text(""));
        }
        Self {
            id: id.into(),
            kind,
            children,
        }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(ElementKind::Paragraph, children)
    }

    /// Note link whose display text is the target's title
    pub fn note_link(note_id: impl Into<String>, note_title: impl Into<String>) -> Self {
        let note_title = note_title.into();
        Self::new(
            ElementKind::NoteLink {
                note_id: note_id.into(),
                note_title: note_title.clone(),
                custom_text: None,
            },
            vec![Node::text(note_title)],
        )
    }

    /// Note link displaying `custom_text` instead of the target's title
    pub fn note_link_with_text(
        note_id: impl Into<String>,
        note_title: impl Into<String>,
        custom_text: impl Into<String>,
    ) -> Self {
        let custom_text = custom_text.into();
        Self::new(
            ElementKind::NoteLink {
                note_id: note_id.into(),
                note_title: note_title.into(),
                custom_text: Some(custom_text.clone()),
            },
            vec![Node::text(custom_text)],
        )
    }

    /// Tag element; a leading `#` on `name` is ignored
    pub fn tag(name: &str) -> Self {
        let name = name.trim_start_matches('#').to_string();
        let display = format!("#{}", name);
        Self::new(ElementKind::Tag { name }, vec![Node::text(display)])
    }

    /// Target note id when this element is a note link
    pub fn linked_note_id(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::NoteLink { note_id, .. } => Some(note_id),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text runs
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl Node {
    /// Plain text leaf with a fresh id
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextRun::new(text))
    }

    pub fn id(&self) -> &str {
        match self {
            Node::Text(run) => &run.id,
            Node::Element(el) => &el.id,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Node::Text(run) => Some(run),
            Node::Element(_) => None,
        }
    }

    /// Children of an element; text leaves have none
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) => &[],
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(run) => run.text.clone(),
            Node::Element(el) => el.text_content(),
        }
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(run) => out.push_str(&run.text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

/// Point inside a text leaf: path to the leaf plus a character offset
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub path: NodePath,
    pub offset: usize,
}

impl Point {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Range between two points (order-insensitive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub anchor: Point,
    pub focus: Point,
}

impl TextRange {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// `(start, end)` in document order
    pub fn ordered(&self) -> (&Point, &Point) {
        if self.anchor <= self.focus {
            (&self.anchor, &self.focus)
        } else {
            (&self.focus, &self.anchor)
        }
    }
}

/// Rich-text document: an ordered list of top-level blocks under an implicit root
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub(crate) children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Document holding one empty paragraph
    pub fn empty() -> Self {
        Self::new(vec![Node::Element(Element::paragraph(vec![]))])
    }

    /// Top-level blocks
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Node at `path`, if any
    pub fn get(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children().get(*index)?;
        }
        Some(node)
    }

    /// Preorder traversal of every node with its path, in document order.
    ///
    /// The iterator is lazy and borrows the document; call again to restart.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants::new(&self.children, Vec::new())
    }

    /// Current path of the node with `id`
    pub fn path_of(&self, id: &str) -> Option<NodePath> {
        self.descendants()
            .find(|(_, node)| node.id() == id)
            .map(|(path, _)| path)
    }

    /// Text of every top-level block, joined by newlines
    pub fn plain_text(&self) -> String {
        self.children
            .iter()
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check structural invariants: no element without children, no reused ids
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(text) = self.children.iter().find_map(Node::as_text) {
            return Err(ValidationError::TextAtRoot {
                id: text.id.clone(),
            });
        }
        let mut seen = HashSet::new();
        for (_, node) in self.descendants() {
            if !seen.insert(node.id()) {
                return Err(ValidationError::DuplicateNodeId {
                    id: node.id().to_string(),
                });
            }
            if let Node::Element(el) = node {
                if el.children.is_empty() {
                    return Err(ValidationError::EmptyChildren { id: el.id.clone() });
                }
            }
        }
        Ok(())
    }
}

/// Preorder iterator over `(path, node)` pairs
#[derive(Clone)]
pub struct Descendants<'a> {
    stack: Vec<(NodePath, &'a Node)>,
}

impl<'a> Descendants<'a> {
    /// Traverse `nodes`, which live at `base` (the empty path for the document root)
    pub fn new(nodes: &'a [Node], base: NodePath) -> Self {
        let mut stack = Vec::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate().rev() {
            let mut path = base.clone();
            path.push(index);
            stack.push((path, node));
        }
        Self { stack }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodePath, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        if let Node::Element(el) = node {
            for (index, child) in el.children.iter().enumerate().rev() {
                let mut child_path = path.clone();
                child_path.push(index);
                self.stack.push((child_path, child));
            }
        }
        Some((path, node))
    }
}
