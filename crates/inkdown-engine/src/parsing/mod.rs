//! # Markdown → Tree
//!
//! Adapter from `pulldown-cmark` events to the editor's [`Node`] tree.
//!
//! The parser itself is an external collaborator; this module only decides how
//! its events map onto editor nodes:
//!
//! - single newlines inside a paragraph become [`NodeKind::LineBreak`]
//!   (breaks-on-newline rendering)
//! - task-list markers become [`NodeKind::Checkbox`]
//! - raw HTML is kept as literal text and never interpreted
//! - top-level blocks are separated by [`NodeKind::Gap`] nodes
//! - image `=WIDTHx` suffixes are resolved through [`images`]

pub mod images;

use crate::tree::{Alignment, ImageAttrs, ListKind, Node, NodeKind, merge_adjacent_text};
use images::{ImageResolver, ImageWidths, extract_widths};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Parse markdown without resolving image paths.
pub fn parse(markdown: &str) -> Node {
    parse_document(markdown, None)
}

/// Parse markdown, resolving image display paths against the notes root.
pub fn parse_with_images(markdown: &str, resolver: &ImageResolver) -> Node {
    parse_document(markdown, Some(resolver))
}

fn parse_document(markdown: &str, resolver: Option<&ImageResolver>) -> Node {
    let (markdown, widths) = extract_widths(markdown);
    let options = Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;

    let mut builder = TreeBuilder::new(widths, resolver);
    for event in Parser::new_ext(&markdown, options) {
        builder.event(event);
    }
    let root = builder.finish();
    log::debug!("parsed {} top-level blocks", root.children.len());
    root
}

/// Normalise a fence info string into a language tag.
pub fn fence_language(info: &str) -> Option<String> {
    let language = info.split_whitespace().next()?.to_lowercase();
    (language != "plaintext").then_some(language)
}

struct Frame {
    /// `None` for containers that contribute only their children.
    kind: Option<NodeKind>,
    children: Vec<Node>,
}

struct TreeBuilder<'a> {
    stack: Vec<Frame>,
    widths: ImageWidths,
    resolver: Option<&'a ImageResolver>,
    table_alignments: Vec<Alignment>,
    in_table_head: bool,
    cell_index: usize,
}

impl<'a> TreeBuilder<'a> {
    fn new(widths: ImageWidths, resolver: Option<&'a ImageResolver>) -> Self {
        Self {
            stack: vec![Frame {
                kind: Some(NodeKind::Root),
                children: Vec::new(),
            }],
            widths,
            resolver,
            table_alignments: Vec::new(),
            in_table_head: false,
            cell_index: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push(Node::new(
                NodeKind::InlineCode,
                vec![Node::text(code.to_string())],
            )),
            Event::Html(html) => self.push_html_lines(&html),
            Event::InlineHtml(html) => self.push(Node::leaf(NodeKind::Html(html.to_string()))),
            Event::SoftBreak | Event::HardBreak => self.push(Node::leaf(NodeKind::LineBreak)),
            Event::Rule => self.push(Node::leaf(NodeKind::ThematicBreak)),
            Event::TaskListMarker(checked) => self.push(Node::leaf(NodeKind::Checkbox { checked })),
            Event::FootnoteReference(label) => self.push_text(&format!("[^{label}]")),
            Event::InlineMath(math) | Event::DisplayMath(math) => self.push_text(&math),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph | Tag::HtmlBlock => Some(NodeKind::paragraph()),
            Tag::Heading { level, .. } => Some(NodeKind::Heading(level as u8)),
            Tag::BlockQuote(_) => Some(NodeKind::BlockQuote),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Some(NodeKind::CodeBlock {
                language: fence_language(&info),
            }),
            Tag::CodeBlock(CodeBlockKind::Indented) => Some(NodeKind::CodeBlock { language: None }),
            Tag::List(Some(start)) => Some(NodeKind::List(ListKind::Ordered { start })),
            Tag::List(None) => Some(NodeKind::List(ListKind::Unordered)),
            Tag::Item => Some(NodeKind::ListItem),
            Tag::Table(alignments) => {
                self.table_alignments = alignments.into_iter().map(alignment).collect();
                Some(NodeKind::Table)
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.cell_index = 0;
                Some(NodeKind::TableHead)
            }
            Tag::TableRow => {
                self.cell_index = 0;
                Some(NodeKind::TableRow)
            }
            Tag::TableCell => {
                let align = self
                    .table_alignments
                    .get(self.cell_index)
                    .copied()
                    .unwrap_or_default();
                self.cell_index += 1;
                Some(NodeKind::TableCell {
                    header: self.in_table_head,
                    align,
                })
            }
            Tag::Emphasis => Some(NodeKind::Emphasis),
            Tag::Strong => Some(NodeKind::Strong),
            Tag::Link { dest_url, .. } => Some(NodeKind::Link {
                href: dest_url.to_string(),
            }),
            Tag::Image { dest_url, .. } => Some(NodeKind::Image(self.image_attrs(&dest_url))),
            _ => None,
        };
        self.stack.push(Frame {
            kind,
            children: Vec::new(),
        });
    }

    fn end(&mut self, tag: TagEnd) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if self.stack.is_empty() {
            // Unbalanced end event; keep the root.
            self.stack.push(frame);
            return;
        }
        let Some(kind) = frame.kind else {
            for child in frame.children {
                self.push(child);
            }
            return;
        };
        let node = match (tag, kind) {
            (TagEnd::CodeBlock, kind) => {
                let mut code: String = frame.children.iter().map(Node::text_content).collect();
                if code.ends_with('\n') {
                    code.pop();
                }
                Node::new(kind, vec![Node::text(code)])
            }
            (TagEnd::Image, NodeKind::Image(mut attrs)) => {
                attrs.alt = frame.children.iter().map(Node::text_content).collect();
                Node::leaf(NodeKind::Image(attrs))
            }
            (TagEnd::TableHead, kind) => {
                self.in_table_head = false;
                Node::new(kind, vec![Node::new(NodeKind::TableRow, frame.children)])
            }
            (TagEnd::Table, kind) => Node::new(kind, split_table(frame.children)),
            (TagEnd::HtmlBlock, kind) => {
                let mut children = frame.children;
                while children.last().is_some_and(|n| n.kind == NodeKind::LineBreak) {
                    children.pop();
                }
                Node::new(kind, children)
            }
            (_, kind) => Node::new(kind, frame.children),
        };
        self.push(node);
    }

    fn image_attrs(&self, dest: &str) -> ImageAttrs {
        let src = match self.resolver {
            Some(resolver) => resolver.resolve(dest),
            None => dest.to_string(),
        };
        ImageAttrs {
            alt: String::new(),
            src,
            original_path: Some(dest.to_string()),
            width: self.widths.get(dest),
        }
    }

    fn push(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    /// Block HTML arrives a line at a time; each line ending becomes a break.
    fn push_html_lines(&mut self, html: &str) {
        for line in html.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            if !content.is_empty() {
                self.push(Node::leaf(NodeKind::Html(content.to_string())));
            }
            if content.len() < line.len() {
                self.push(Node::leaf(NodeKind::LineBreak));
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        let text = match frame.children.last() {
            Some(last) if matches!(last.kind, NodeKind::Checkbox { .. }) => text.trim_start(),
            _ => text,
        };
        if let Some(last) = frame.children.last_mut()
            && let Some(existing) = last.as_text_mut()
        {
            existing.push_str(text);
            return;
        }
        frame.children.push(Node::text(text));
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            if let Some(frame) = self.stack.pop() {
                let node = match frame.kind {
                    Some(kind) => Node::new(kind, frame.children),
                    None => Node::root(frame.children),
                };
                self.push(node);
            }
        }
        let mut blocks = self
            .stack
            .pop()
            .map(|frame| frame.children)
            .unwrap_or_default();
        merge_adjacent_text(&mut blocks);
        Node::root(with_gaps(blocks))
    }
}

fn alignment(align: pulldown_cmark::Alignment) -> Alignment {
    match align {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}

/// `[TableHead, TableRow...]` → `[TableHead, TableBody[TableRow...]]`.
fn split_table(children: Vec<Node>) -> Vec<Node> {
    let (head, rows): (Vec<Node>, Vec<Node>) = children
        .into_iter()
        .partition(|child| child.kind == NodeKind::TableHead);
    let mut out = head;
    if !rows.is_empty() {
        out.push(Node::new(NodeKind::TableBody, rows));
    }
    out
}

fn with_gaps(blocks: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(blocks.len() * 2);
    for (index, block) in blocks.into_iter().enumerate() {
        if index > 0 {
            out.push(Node::leaf(NodeKind::Gap));
        }
        out.push(block);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::outline;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_blocks_with_gaps() {
        let root = parse("# Title\n\nSome *text* here\nnext line\n\n---\n");
        assert_snapshot!(outline(&root), @r#"
        Heading 1
          Text "Title"
        Gap
        Paragraph
          Text "Some "
          Emphasis
            Text "text"
          Text " here"
          LineBreak
          Text "next line"
        Gap
        ThematicBreak
        "#);
    }

    #[test]
    fn test_parse_task_list() {
        let root = parse("- [ ] todo\n- [x] done\n");
        assert_snapshot!(outline(&root), @r#"
        List
          ListItem
            Checkbox checked=false
            Text "todo"
          ListItem
            Checkbox checked=true
            Text "done"
        "#);
    }

    #[test]
    fn test_parse_code_block_strips_trailing_newline() {
        let root = parse("```rust\nfn main() {}\n```\n");
        assert_snapshot!(outline(&root), @r#"
        CodeBlock Some("rust")
          Text "fn main() {}"
        "#);
    }

    #[test]
    fn test_parse_table_splits_head_and_body() {
        let root = parse("| a | b |\n|:---|---:|\n| 1 | 2 |\n");
        assert_snapshot!(outline(&root), @r#"
        Table
          TableHead
            TableRow
              TableCell header=true Left
                Text "a"
              TableCell header=true Right
                Text "b"
          TableBody
            TableRow
              TableCell header=false Left
                Text "1"
              TableCell header=false Right
                Text "2"
        "#);
    }

    #[test]
    fn test_parse_image_width_and_resolution() {
        let resolver = ImageResolver::new("/notes", "daily/today.md");
        let root = parse_with_images("![cat](cat.png =250x)\n", &resolver);
        let image = &root.children[0].children[0];
        let NodeKind::Image(attrs) = &image.kind else {
            panic!("expected image, got {:?}", image.kind);
        };
        assert_eq!(attrs.alt, "cat");
        assert_eq!(attrs.src, "file:///notes/daily/cat.png");
        assert_eq!(attrs.original_path.as_deref(), Some("cat.png"));
        assert_eq!(attrs.width, Some(250));
    }

    #[test]
    fn test_inline_html_is_kept_apart_from_text() {
        let root = parse("a <b>bold</b> word\n");
        assert_eq!(root.children[0].text_content(), "a bold word");
        assert_snapshot!(outline(&root), @r#"
        Paragraph
          Text "a "
          Html "<b>"
          Text "bold"
          Html "</b>"
          Text " word"
        "#);
    }

    #[test]
    fn test_html_block_keeps_its_lines() {
        let root = parse("<div>\n<p>x</p>\n</div>\n");
        assert_snapshot!(outline(&root), @r#"
        Paragraph
          Html "<div>"
          LineBreak
          Html "<p>x</p>"
          LineBreak
          Html "</div>"
        "#);
    }

    #[rstest]
    #[case("", None)]
    #[case("plaintext", None)]
    #[case("Rust", Some("rust"))]
    #[case("python title=x", Some("python"))]
    fn test_fence_language(#[case] info: &str, #[case] expected: Option<&str>) {
        assert_eq!(fence_language(info).as_deref(), expected);
    }
}
