//! # Document Tree
//!
//! The structured side of the editor: an owned tree of block and inline nodes
//! that the surface edits and the serializer turns back into markdown.
//!
//! ## Shape
//!
//! - A [`Node`] owns its children exclusively; there are no parent pointers.
//!   Positions are addressed with a [`NodePath`] of child indices from the root.
//! - Leaves are either text runs ([`NodeKind::Text`]) or void elements
//!   (line break, image, checkbox, rule, gap). Widget chrome
//!   ([`NodeKind::LanguageSelector`], [`NodeKind::ResizeHandle`]) is never part
//!   of the document's text.
//! - All lengths and offsets are counted in `char`s.
//!
//! ## Empty text runs
//!
//! An empty `Text` is only kept where the caret needs somewhere to live, e.g.
//! a freshly created heading or paragraph.

mod inline;
mod path;

pub use inline::{merge_adjacent_text, slice_inlines};
pub use path::NodePath;

use serde::{Deserialize, Serialize};

/// Zero-width space used to anchor the caret outside inline elements.
pub const CARET_ANCHOR: char = '\u{200B}';

/// Marks carried by a paragraph while it is being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphMarks {
    /// Synthesized only to host the caret; contributes nothing to markdown.
    pub placeholder: bool,
    /// Set when the paragraph holds an opening ``` fence awaiting its closer.
    /// The value is the language typed after the backticks (may be empty).
    pub fence_open: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Unordered,
    Ordered { start: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Attributes of an image element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub alt: String,
    /// Runtime display path (may be an absolute `file:///` URL).
    pub src: String,
    /// The path exactly as typed in markdown.
    pub original_path: Option<String>,
    /// Explicit pixel width from a `=WIDTHx` suffix or a resize.
    pub width: Option<u32>,
}

impl ImageAttrs {
    /// Path to write back into markdown: never the resolved display path
    /// when the typed one is known.
    pub fn markdown_path(&self) -> &str {
        self.original_path.as_deref().unwrap_or(&self.src)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Root,

    // Blocks
    Paragraph(ParagraphMarks),
    Heading(u8),
    List(ListKind),
    ListItem,
    BlockQuote,
    CodeBlock { language: Option<String> },
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableCell { header: bool, align: Alignment },
    ThematicBreak,
    /// Blank-line separator between top-level blocks of a parsed document.
    Gap,

    // Inlines
    Text(String),
    Emphasis,
    Strong,
    InlineCode,
    Link { href: String },
    Image(ImageAttrs),
    LineBreak,
    Checkbox { checked: bool },
    /// Raw HTML, kept verbatim and never edited as text.
    Html(String),

    // Widget layer
    CodeBlockWrapper,
    LanguageSelector { language: Option<String> },
    ImageWrapper,
    ResizeHandle,
}

impl NodeKind {
    pub fn paragraph() -> Self {
        NodeKind::Paragraph(ParagraphMarks::default())
    }

    pub fn placeholder() -> Self {
        NodeKind::Paragraph(ParagraphMarks {
            placeholder: true,
            fence_open: None,
        })
    }

    /// Block-level kinds, including the layout wrappers that sit between blocks.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph(_)
                | NodeKind::Heading(_)
                | NodeKind::List(_)
                | NodeKind::ListItem
                | NodeKind::BlockQuote
                | NodeKind::CodeBlock { .. }
                | NodeKind::Table
                | NodeKind::ThematicBreak
                | NodeKind::Gap
                | NodeKind::CodeBlockWrapper
        )
    }

    /// UI chrome: excluded from text, caret walks and markdown.
    pub fn is_chrome(&self) -> bool {
        matches!(
            self,
            NodeKind::LanguageSelector { .. } | NodeKind::ResizeHandle
        )
    }

    /// Leaves that are not text runs.
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            NodeKind::LineBreak
                | NodeKind::Html(_)
                | NodeKind::Image(_)
                | NodeKind::Checkbox { .. }
                | NodeKind::ThematicBreak
                | NodeKind::Gap
        )
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }

    pub fn leaf(kind: NodeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn root(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Root, children)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text(text.into()))
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(NodeKind::paragraph(), children)
    }

    /// Empty placeholder paragraph holding an empty text run for the caret.
    pub fn placeholder() -> Self {
        Self::new(NodeKind::placeholder(), vec![Node::text("")])
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of all descendant runs, chrome excluded.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(text) => out.push_str(text),
            kind if kind.is_chrome() => {}
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Length of [`Node::text_content`] in chars.
    pub fn char_len(&self) -> usize {
        match &self.kind {
            NodeKind::Text(text) => text.chars().count(),
            kind if kind.is_chrome() => 0,
            _ => self.children.iter().map(Node::char_len).sum(),
        }
    }

    /// True when the node shows no text once caret anchors are ignored.
    pub fn is_visibly_empty(&self) -> bool {
        self.text_content()
            .chars()
            .all(|c| c.is_whitespace() || c == CARET_ANCHOR)
    }

    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        let mut node = self;
        for &index in path.indices() {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut node = self;
        for &index in path.indices() {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Replace the node at `path`, returning the previous node.
    pub fn replace(&mut self, path: &NodePath, node: Node) -> Option<Node> {
        let slot = self.get_mut(path)?;
        Some(std::mem::replace(slot, node))
    }

    /// Remove the node at `path` from its parent.
    pub fn remove(&mut self, path: &NodePath) -> Option<Node> {
        let (parent, index) = path.split_last()?;
        let parent = self.get_mut(&parent)?;
        (index < parent.children.len()).then(|| parent.children.remove(index))
    }

    /// Insert `node` so that it ends up at `path`.
    pub fn insert(&mut self, path: &NodePath, node: Node) -> Option<()> {
        let (parent, index) = path.split_last()?;
        let parent = self.get_mut(&parent)?;
        if index > parent.children.len() {
            return None;
        }
        parent.children.insert(index, node);
        Some(())
    }

    /// Paths of all text runs below `self`, in document order, chrome excluded.
    /// Paths are relative to `self`.
    pub fn text_paths(&self) -> Vec<NodePath> {
        let mut out = Vec::new();
        self.walk_text(&mut NodePath::root(), &mut out);
        out
    }

    fn walk_text(&self, at: &mut NodePath, out: &mut Vec<NodePath>) {
        for (index, child) in self.children.iter().enumerate() {
            at.push(index);
            match &child.kind {
                NodeKind::Text(_) => out.push(at.clone()),
                kind if kind.is_chrome() => {}
                _ => child.walk_text(at, out),
            }
            at.pop();
        }
    }

    /// Depth-first search for the first descendant matching `pred`.
    pub fn find(&self, pred: &impl Fn(&Node) -> bool) -> Option<NodePath> {
        fn go(node: &Node, at: &mut NodePath, pred: &impl Fn(&Node) -> bool) -> bool {
            for (index, child) in node.children.iter().enumerate() {
                at.push(index);
                if pred(child) || go(child, at, pred) {
                    return true;
                }
                at.pop();
            }
            false
        }
        let mut at = NodePath::root();
        go(self, &mut at, pred).then_some(at)
    }

    /// Every descendant matching `pred`, in document order.
    pub fn find_all(&self, pred: &impl Fn(&Node) -> bool) -> Vec<NodePath> {
        fn go(
            node: &Node,
            at: &mut NodePath,
            pred: &impl Fn(&Node) -> bool,
            out: &mut Vec<NodePath>,
        ) {
            for (index, child) in node.children.iter().enumerate() {
                at.push(index);
                if pred(child) {
                    out.push(at.clone());
                }
                go(child, at, pred, out);
                at.pop();
            }
        }
        let mut out = Vec::new();
        go(self, &mut NodePath::root(), pred, &mut out);
        out
    }

    /// Nearest ancestor of `path` (inclusive) whose kind satisfies `pred`.
    pub fn closest(&self, path: &NodePath, pred: impl Fn(&NodeKind) -> bool) -> Option<NodePath> {
        let mut at = path.clone();
        loop {
            if at.is_root() {
                return None;
            }
            if pred(&self.get(&at)?.kind) {
                return Some(at);
            }
            at = at.parent()?;
        }
    }
}

/// Readable outline of a tree, one node per line, used by tests.
pub fn outline(node: &Node) -> String {
    let mut lines = Vec::new();
    for child in &node.children {
        outline_into(child, 0, &mut lines);
    }
    lines.join("\n")
}

fn outline_into(node: &Node, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let label = match &node.kind {
        NodeKind::Text(text) => format!("Text {text:?}"),
        NodeKind::Html(html) => format!("Html {html:?}"),
        NodeKind::Paragraph(marks) if marks.placeholder => "Paragraph (placeholder)".to_string(),
        NodeKind::Paragraph(marks) => match &marks.fence_open {
            Some(language) => format!("Paragraph (fence {language:?})"),
            None => "Paragraph".to_string(),
        },
        NodeKind::Heading(level) => format!("Heading {level}"),
        NodeKind::List(ListKind::Unordered) => "List".to_string(),
        NodeKind::List(ListKind::Ordered { start }) => format!("List ordered from {start}"),
        NodeKind::CodeBlock { language } => format!("CodeBlock {language:?}"),
        NodeKind::TableCell { header, align } => format!("TableCell header={header} {align:?}"),
        NodeKind::Link { href } => format!("Link {href:?}"),
        NodeKind::Image(attrs) => format!(
            "Image alt={:?} path={:?} width={:?}",
            attrs.alt,
            attrs.markdown_path(),
            attrs.width
        ),
        NodeKind::Checkbox { checked } => format!("Checkbox checked={checked}"),
        NodeKind::LanguageSelector { language } => format!("LanguageSelector {language:?}"),
        other => format!("{other:?}"),
    };
    lines.push(format!("{indent}{label}"));
    for child in &node.children {
        outline_into(child, depth + 1, lines);
    }
}
