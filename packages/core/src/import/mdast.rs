//! Generic markdown syntax tree
//!
//! A small mdast-shaped tree: the output of [`parse_markdown`](super::parse_markdown)
//! and the input/output of [`normalize`](super::normalize). It derives serde
//! so trees produced by other markdown front-ends can be fed in as JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MdNode {
    Root {
        children: Vec<MdNode>,
    },
    Paragraph {
        children: Vec<MdNode>,
    },
    Heading {
        depth: u8,
        children: Vec<MdNode>,
    },
    List {
        ordered: bool,
        children: Vec<MdNode>,
    },
    /// `checked` is present only on checklist items
    ListItem {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
        children: Vec<MdNode>,
    },
    Blockquote {
        children: Vec<MdNode>,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        value: String,
    },
    Html {
        value: String,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: String,
    },
    Link {
        url: String,
        children: Vec<MdNode>,
    },
    Text {
        value: String,
    },
    Emphasis {
        children: Vec<MdNode>,
    },
    Strong {
        children: Vec<MdNode>,
    },
    Delete {
        children: Vec<MdNode>,
    },
    InlineCode {
        value: String,
    },
    ThematicBreak,
    Break,
    Table {
        children: Vec<MdNode>,
    },
    TableRow {
        children: Vec<MdNode>,
    },
    TableCell {
        children: Vec<MdNode>,
    },
    /// Folded `<details>` disclosure block
    Details {
        summary: String,
        children: Vec<MdNode>,
    },
    /// Folded raw html `<table>`; each row holds the inner html of its cells
    HtmlTable {
        #[serde(rename = "tableRows")]
        table_rows: Vec<Vec<String>>,
    },
}

impl MdNode {
    pub fn root(children: Vec<MdNode>) -> Self {
        MdNode::Root { children }
    }

    pub fn text(value: impl Into<String>) -> Self {
        MdNode::Text {
            value: value.into(),
        }
    }

    pub fn html(value: impl Into<String>) -> Self {
        MdNode::Html {
            value: value.into(),
        }
    }

    /// Children of a container node; leaves have none
    pub fn children(&self) -> &[MdNode] {
        match self {
            MdNode::Root { children }
            | MdNode::Paragraph { children }
            | MdNode::Heading { children, .. }
            | MdNode::List { children, .. }
            | MdNode::ListItem { children, .. }
            | MdNode::Blockquote { children }
            | MdNode::Link { children, .. }
            | MdNode::Emphasis { children }
            | MdNode::Strong { children }
            | MdNode::Delete { children }
            | MdNode::Table { children }
            | MdNode::TableRow { children }
            | MdNode::TableCell { children }
            | MdNode::Details { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<MdNode>> {
        match self {
            MdNode::Root { children }
            | MdNode::Paragraph { children }
            | MdNode::Heading { children, .. }
            | MdNode::List { children, .. }
            | MdNode::ListItem { children, .. }
            | MdNode::Blockquote { children }
            | MdNode::Link { children, .. }
            | MdNode::Emphasis { children }
            | MdNode::Strong { children }
            | MdNode::Delete { children }
            | MdNode::Table { children }
            | MdNode::TableRow { children }
            | MdNode::TableCell { children }
            | MdNode::Details { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Take ownership of the children, leaving the node empty
    pub(crate) fn take_children(&mut self) -> Vec<MdNode> {
        self.children_mut().map(std::mem::take).unwrap_or_default()
    }

    /// A node is a checklist item iff it carries a `checked` flag
    pub fn is_checklist_item(&self) -> bool {
        matches!(self, MdNode::ListItem { checked: Some(_), .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, MdNode::Image { .. })
    }

    /// Inline (phrasing) content
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            MdNode::Text { .. }
                | MdNode::Emphasis { .. }
                | MdNode::Strong { .. }
                | MdNode::Delete { .. }
                | MdNode::InlineCode { .. }
                | MdNode::Link { .. }
                | MdNode::Image { .. }
                | MdNode::Break
        )
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String {
        match self {
            MdNode::Text { value } | MdNode::InlineCode { value } | MdNode::Code { value, .. } => {
                value.clone()
            }
            MdNode::Image { alt, .. } => alt.clone(),
            other => other.children().iter().map(MdNode::text_content).collect(),
        }
    }
}
