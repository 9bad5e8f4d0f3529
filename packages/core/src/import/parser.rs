//! Markdown text to [`MdNode`] via pulldown-cmark

use super::mdast::MdNode;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

/// Parse markdown text into a `Root` node.
///
/// Tables, task lists and strikethrough are enabled. Constructs with no
/// counterpart in [`MdNode`] (footnote definitions, metadata blocks) are
/// skipped along with their content.
pub fn parse_markdown(text: &str) -> MdNode {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    builder.finish()
}

struct TreeBuilder {
    stack: Vec<MdNode>,
    /// Depth inside an unsupported construct
    skipping: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![MdNode::root(Vec::new())],
            skipping: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        if self.skipping > 0 {
            match event {
                Event::Start(_) => self.skipping += 1,
                Event::End(_) => self.skipping -= 1,
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => match open_node(tag) {
                Some(node) => self.stack.push(node),
                None => self.skipping = 1,
            },
            Event::End(_) => self.close(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push(MdNode::InlineCode {
                value: code.to_string(),
            }),
            Event::Html(html) => match self.stack.last_mut() {
                Some(MdNode::Html { value }) => value.push_str(&html),
                _ => self.push(MdNode::html(html.to_string())),
            },
            Event::InlineHtml(html) => self.push(MdNode::html(html.to_string())),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.push(MdNode::Break),
            Event::Rule => self.push(MdNode::ThematicBreak),
            Event::TaskListMarker(done) => {
                let item = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|node| matches!(node, MdNode::ListItem { .. }));
                if let Some(MdNode::ListItem { checked, .. }) = item {
                    *checked = Some(done);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(MdNode::Code { value, .. }) | Some(MdNode::Html { value }) => value.push_str(text),
            Some(MdNode::Image { alt, .. }) => alt.push_str(text),
            Some(parent) => {
                let Some(children) = parent.children_mut() else {
                    return;
                };
                if let Some(MdNode::Text { value }) = children.last_mut() {
                    value.push_str(text);
                } else {
                    children.push(MdNode::text(text));
                }
            }
            None => {}
        }
    }

    fn push(&mut self, node: MdNode) {
        if let Some(children) = self.stack.last_mut().and_then(MdNode::children_mut) {
            children.push(node);
        }
    }

    fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(mut node) = self.stack.pop() {
            if let MdNode::Code { value, .. } = &mut node {
                let trimmed = value.trim_end_matches('\n').len();
                value.truncate(trimmed);
            }
            self.push(node);
        }
    }

    fn finish(mut self) -> MdNode {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack.pop().unwrap_or_else(|| MdNode::root(Vec::new()))
    }
}

fn open_node(tag: Tag<'_>) -> Option<MdNode> {
    let node = match tag {
        Tag::Paragraph => MdNode::Paragraph {
            children: Vec::new(),
        },
        Tag::Heading { level, .. } => MdNode::Heading {
            depth: level as u8,
            children: Vec::new(),
        },
        Tag::BlockQuote { .. } => MdNode::Blockquote {
            children: Vec::new(),
        },
        Tag::CodeBlock(kind) => MdNode::Code {
            lang: match kind {
                CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                    Some(lang.trim().to_string())
                }
                _ => None,
            },
            value: String::new(),
        },
        Tag::HtmlBlock => MdNode::html(String::new()),
        Tag::List(start) => MdNode::List {
            ordered: start.is_some(),
            children: Vec::new(),
        },
        Tag::Item => MdNode::ListItem {
            checked: None,
            children: Vec::new(),
        },
        Tag::Table { .. } => MdNode::Table {
            children: Vec::new(),
        },
        Tag::TableHead | Tag::TableRow => MdNode::TableRow {
            children: Vec::new(),
        },
        Tag::TableCell => MdNode::TableCell {
            children: Vec::new(),
        },
        Tag::Emphasis => MdNode::Emphasis {
            children: Vec::new(),
        },
        Tag::Strong => MdNode::Strong {
            children: Vec::new(),
        },
        Tag::Strikethrough => MdNode::Delete {
            children: Vec::new(),
        },
        Tag::Link { dest_url, .. } => MdNode::Link {
            url: dest_url.to_string(),
            children: Vec::new(),
        },
        Tag::Image { dest_url, .. } => MdNode::Image {
            url: dest_url.to_string(),
            alt: String::new(),
        },
        _ => return None,
    };
    Some(node)
}
