//! # Tree → Markdown
//!
//! Canonical markdown for a document tree. Serialization is deterministic and
//! never panics: a tree nested deeper than [`MAX_DEPTH`] yields
//! [`ConversionError::TooDeep`] so the session can refuse to persist.
//!
//! Text runs are escaped so literal `*`, `_` and friends survive a round
//! trip, and a line that would otherwise open a block (`# `, `> `, `- `, `1. `)
//! gets its marker escaped. [`serialize_with_raw`] leaves chosen top-level
//! blocks unescaped so syntax typed into them re-parses as formatting.
//!
//! After emitting every node, runs of three or more newlines collapse to two
//! and caret anchors (`U+200B`) are removed.

use crate::error::ConversionError;
use crate::tree::{Alignment, CARET_ANCHOR, ListKind, Node, NodeKind};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

pub const MAX_DEPTH: usize = 128;

static BLANK_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank-run regex"));
static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^( {0,3})(?:#{1,6}(?:[ \t]|$)|>|[-+](?:[ \t]|$)|-+[ \t]*$|=+[ \t]*$|(\d{1,9})[.)](?:[ \t]|$))")
        .expect("valid block-start regex")
});

/// Serialize a document (or any subtree) to markdown.
pub fn serialize(root: &Node) -> Result<String, ConversionError> {
    serialize_with_raw(root, 0..0)
}

/// Like [`serialize`], but the top-level blocks at `raw` keep their text as
/// typed.
pub fn serialize_with_raw(root: &Node, raw: Range<usize>) -> Result<String, ConversionError> {
    let mut writer = Writer {
        out: String::new(),
        escape: true,
    };
    if root.kind == NodeKind::Root {
        for (index, block) in root.children.iter().enumerate() {
            writer.escape = !raw.contains(&index);
            writer.node(block, 1)?;
        }
    } else {
        writer.node(root, 0)?;
    }
    let collapsed = BLANK_RUNS.replace_all(&writer.out, "\n\n");
    Ok(collapsed.replace(CARET_ANCHOR, ""))
}

struct Writer {
    out: String,
    escape: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Escaped,
    Raw,
    /// Inside a code block: raw, and inline code loses its backticks.
    Code,
}

fn check_depth(depth: usize) -> Result<(), ConversionError> {
    if depth > MAX_DEPTH {
        return Err(ConversionError::TooDeep { limit: MAX_DEPTH });
    }
    Ok(())
}

impl Writer {
    fn style(&self) -> Style {
        if self.escape { Style::Escaped } else { Style::Raw }
    }

    fn node(&mut self, node: &Node, depth: usize) -> Result<(), ConversionError> {
        check_depth(depth)?;
        match &node.kind {
            NodeKind::Root | NodeKind::CodeBlockWrapper | NodeKind::ImageWrapper => {
                for child in &node.children {
                    self.node(child, depth + 1)?;
                }
            }
            NodeKind::Paragraph(marks) => {
                if marks.placeholder {
                    return Ok(());
                }
                let text = if marks.fence_open.is_some() {
                    inline(&node.children, depth + 1, Style::Raw)?
                } else {
                    self.block_text(&node.children, depth + 1)?
                };
                self.out.push_str(&text);
                self.out.push('\n');
            }
            NodeKind::Heading(level) => {
                let text = inline(&node.children, depth + 1, self.style())?;
                self.out.push_str(&"#".repeat(usize::from(*level)));
                self.out.push(' ');
                self.out.push_str(&text);
                self.out.push('\n');
            }
            NodeKind::CodeBlock { language } => {
                let code = inline(&node.children, depth + 1, Style::Code)?;
                self.out.push_str("```");
                if let Some(language) = language.as_deref().filter(|l| *l != "plaintext") {
                    self.out.push_str(language);
                }
                self.out.push('\n');
                self.out.push_str(&code);
                self.out.push_str("\n```\n");
            }
            NodeKind::List(kind) => {
                self.list(node, *kind, 0, depth)?;
                self.out.push('\n');
            }
            NodeKind::BlockQuote => self.blockquote(node, depth)?,
            NodeKind::ThematicBreak => self.out.push_str("---\n\n"),
            NodeKind::Gap => self.out.push('\n'),
            NodeKind::Table => self.table(node, depth)?,
            kind if kind.is_chrome() => {}
            // Inline content outside any block (e.g. a bare root text run).
            _ => {
                let text = inline(std::slice::from_ref(node), depth, self.style())?;
                self.out.push_str(&text);
            }
        }
        Ok(())
    }

    fn list(
        &mut self,
        list: &Node,
        kind: ListKind,
        level: usize,
        depth: usize,
    ) -> Result<(), ConversionError> {
        check_depth(depth)?;
        let indent = "  ".repeat(level);
        let items = list
            .children
            .iter()
            .filter(|child| child.kind == NodeKind::ListItem);
        for (position, item) in items.enumerate() {
            let (checkbox, content) = split_checkbox(&item.children);
            let marker = match kind {
                ListKind::Unordered => "-".to_string(),
                ListKind::Ordered { .. } => format!("{}.", position + 1),
            };
            self.out.push_str(&indent);
            self.out.push_str(&marker);
            self.out.push(' ');
            if let Some(checked) = checkbox {
                self.out.push_str(if checked { "[x] " } else { "[ ] " });
            }

            let mut nested = Vec::new();
            let mut line = String::new();
            for child in content {
                match &child.kind {
                    NodeKind::List(nested_kind) => nested.push((child, *nested_kind)),
                    NodeKind::Paragraph(marks) if marks.placeholder => {}
                    NodeKind::Paragraph(_) => {
                        if !line.is_empty() {
                            line.push(' ');
                        }
                        line.push_str(&inline(&child.children, depth + 2, self.style())?);
                    }
                    _ => line.push_str(&inline(std::slice::from_ref(child), depth + 1, self.style())?),
                }
            }
            if checkbox.is_some() {
                line = line.trim_start().to_string();
            }
            if self.escape {
                line = escape_line_starts(&line);
            }
            self.out.push_str(&line);
            self.out.push('\n');

            for (nested_list, nested_kind) in nested {
                self.list(nested_list, nested_kind, level + 1, depth + 2)?;
            }
        }
        Ok(())
    }

    fn blockquote(&mut self, quote: &Node, depth: usize) -> Result<(), ConversionError> {
        let mut parts = Vec::new();
        for child in &quote.children {
            let mut inner = Writer {
                out: String::new(),
                escape: self.escape,
            };
            inner.node(child, depth + 1)?;
            let block = inner.out.trim().to_string();
            if block.is_empty() {
                continue;
            }
            let prefixed: Vec<String> = block.lines().map(|line| format!("> {line}")).collect();
            parts.push(prefixed.join("\n"));
        }
        self.out.push_str(&parts.join("\n"));
        self.out.push_str("\n\n");
        Ok(())
    }

    fn table(&mut self, table: &Node, depth: usize) -> Result<(), ConversionError> {
        let head_row = table
            .children
            .iter()
            .find(|child| child.kind == NodeKind::TableHead)
            .and_then(|head| head.children.iter().find(|r| r.kind == NodeKind::TableRow));
        let Some(head_row) = head_row else {
            return Ok(());
        };

        let mut alignments = Vec::new();
        let mut cells = Vec::new();
        for cell in &head_row.children {
            if let NodeKind::TableCell { align, .. } = cell.kind {
                alignments.push(align);
                cells.push(cell_text(cell, depth + 3, self.style())?);
            }
        }
        self.out.push_str(&format!("| {} |\n", cells.join(" | ")));
        let separators: Vec<&str> = alignments
            .iter()
            .map(|align| match align {
                Alignment::Center => ":---:",
                Alignment::Right => "---:",
                Alignment::Left | Alignment::None => ":---",
            })
            .collect();
        self.out.push_str(&format!("|{}|\n", separators.join("|")));

        let body_rows = table
            .children
            .iter()
            .filter(|child| child.kind == NodeKind::TableBody)
            .flat_map(|body| body.children.iter())
            .filter(|row| row.kind == NodeKind::TableRow);
        for row in body_rows {
            let cells = row
                .children
                .iter()
                .map(|cell| cell_text(cell, depth + 3, self.style()))
                .collect::<Result<Vec<_>, _>>()?;
            self.out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        self.out.push('\n');
        Ok(())
    }

    /// Inline content of a paragraph, block markers at line starts escaped.
    fn block_text(&self, nodes: &[Node], depth: usize) -> Result<String, ConversionError> {
        let text = inline(nodes, depth, self.style())?;
        Ok(if self.escape { escape_line_starts(&text) } else { text })
    }
}

fn cell_text(cell: &Node, depth: usize, style: Style) -> Result<String, ConversionError> {
    let text = inline(&cell.children, depth, style)?;
    let text = text.trim();
    Ok(if style == Style::Escaped {
        text.replace('|', "\\|")
    } else {
        text.to_string()
    })
}

fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().filter(|&c| c != CARET_ANCHOR).collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        // `snake_case` cannot open emphasis, so it stays readable.
        let intraword = c == '_'
            && i > 0
            && chars[i - 1].is_alphanumeric()
            && chars.get(i + 1).is_some_and(|next| next.is_alphanumeric());
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') && !intraword {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_line_starts(text: &str) -> String {
    text.split('\n')
        .map(|line| match BLOCK_START.captures(line) {
            Some(caps) => {
                let at = caps.get(2).or_else(|| caps.get(1)).map_or(0, |m| m.end());
                format!("{}\\{}", &line[..at], &line[at..])
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leading checkbox of a list item, looking through a first paragraph.
fn split_checkbox(children: &[Node]) -> (Option<bool>, Vec<&Node>) {
    let mut content: Vec<&Node> = children.iter().collect();
    let mut checked = None;
    if let Some(first) = content.first()
        && let NodeKind::Checkbox { checked: state } = first.kind
    {
        checked = Some(state);
        content.remove(0);
    } else if let Some(first) = content.first()
        && matches!(first.kind, NodeKind::Paragraph(_))
        && let Some(NodeKind::Checkbox { checked: state }) = first.children.first().map(|n| &n.kind)
    {
        checked = Some(*state);
        let paragraph = content.remove(0);
        let rest: Vec<&Node> = paragraph.children.iter().skip(1).collect();
        content.splice(0..0, rest);
    }
    (checked, content)
}

/// Markdown for a run of inline nodes.
fn inline(nodes: &[Node], depth: usize, style: Style) -> Result<String, ConversionError> {
    check_depth(depth)?;
    let mut out = String::new();
    for node in nodes {
        match &node.kind {
            NodeKind::Text(text) if style == Style::Escaped => out.push_str(&escape_text(text)),
            NodeKind::Text(text) | NodeKind::Html(text) => out.push_str(text),
            NodeKind::Strong => {
                let inner = inline(&node.children, depth + 1, style)?;
                out.push_str(&format!("**{inner}**"));
            }
            NodeKind::Emphasis => {
                let inner = inline(&node.children, depth + 1, style)?;
                out.push_str(&format!("*{inner}*"));
            }
            NodeKind::InlineCode => {
                let raw = if style == Style::Code { Style::Code } else { Style::Raw };
                let inner = inline(&node.children, depth + 1, raw)?;
                if style == Style::Code {
                    out.push_str(&inner);
                } else {
                    out.push_str(&format!("`{inner}`"));
                }
            }
            NodeKind::Link { href } => {
                let inner = inline(&node.children, depth + 1, style)?;
                out.push_str(&format!("[{inner}]({href})"));
            }
            NodeKind::Image(attrs) => {
                out.push_str(&format!("![{}]({}", attrs.alt, attrs.markdown_path()));
                if let Some(width) = attrs.width {
                    out.push_str(&format!(" ={width}x"));
                }
                out.push(')');
            }
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::Checkbox { checked } => out.push_str(if *checked { "[x] " } else { "[ ] " }),
            kind if kind.is_chrome() => {}
            _ => out.push_str(&inline(&node.children, depth + 1, style)?),
        }
    }
    Ok(out)
}
