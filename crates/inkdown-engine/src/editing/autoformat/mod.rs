//! # Autoformat
//!
//! Turns markdown typed into a block into structured nodes, one block at a
//! time. The block containing the caret is scanned against the ordered
//! [`rules::RULES`] table and the first match is applied:
//!
//! | Order | Rule           | Result                                   |
//! |-------|----------------|------------------------------------------|
//! | 1     | heading        | block becomes a heading                  |
//! | 2     | thematic-break | rule plus a fresh paragraph              |
//! | 3     | fence          | marks a pending fence, or full re-render |
//! | 4     | list           | bullet or checkbox list                  |
//! | 5     | blockquote     | quote wrapping a paragraph               |
//! | 6     | table-row      | full re-render                           |
//! | 7     | emphasis       | `***`, then `**`, then `*`               |
//! | 8     | inline-code    | single backtick span                     |
//!
//! Block rules only fire in paragraphs; emphasis and code also fire in
//! headings and simple list items. Code blocks are never scanned.

pub mod rules;
mod transform;

use crate::editing::caret::{self, Caret};
use crate::error::TransformError;
use crate::tree::{Node, NodeKind, NodePath};
use rules::{LineContext, scan};
use std::ops::Range;

/// The key event that started an autoformat pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Keystroke,
    Enter,
    Paste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullRenderReason {
    /// ```` ```code``` ```` completed on a single line.
    InlineFence,
    /// A second ``` closed a pending fence.
    FenceClosed,
    TableRow,
    Paste,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoMatch,
    /// Caret is in a code block or has no block to scan.
    Suppressed,
    /// An opening fence was marked; nothing was transformed.
    FencePending,
    Applied { rule: &'static str, caret: Caret },
    /// The document must be re-rendered from its markdown.
    FullRender(FullRenderReason),
}

/// Scan the block under `caret` and apply the first matching rule.
///
/// On `Err` the tree may be partially modified; callers restore their own
/// snapshot.
pub fn autoformat(root: &mut Node, caret: &Caret, trigger: Trigger) -> Result<Outcome, TransformError> {
    let caret = wrap_root_text(root, caret);

    let Some(container) = root.closest(&caret.path, is_container) else {
        return Ok(Outcome::Suppressed);
    };
    let block = root.get(&container).ok_or(TransformError::MissingNode)?;
    match &block.kind {
        NodeKind::CodeBlock { .. } => return Ok(Outcome::Suppressed),
        NodeKind::ListItem if !block.children.iter().all(is_inline) => {
            return Ok(Outcome::Suppressed);
        }
        _ => {}
    }

    let text = block.text_content();
    let code_ranges = inline_code_ranges(block);
    let cursor = caret::offset_within(root, &container, &caret).ok_or(TransformError::MissingNode)?;
    let ctx = LineContext {
        text: &text,
        trigger,
        code_ranges: &code_ranges,
        block_rules: matches!(block.kind, NodeKind::Paragraph(_)),
    };

    let Some((rule, found)) = scan(&ctx) else {
        return Ok(Outcome::NoMatch);
    };
    log::debug!("autoformat: {} matched {:?}", rule.name, found.span);
    transform::apply(root, &container, cursor, rule.name, &found, trigger)
}

fn is_container(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Paragraph(_) | NodeKind::Heading(_) | NodeKind::ListItem | NodeKind::CodeBlock { .. }
    )
}

fn is_inline(node: &Node) -> bool {
    !node.kind.is_block()
}

/// A text run typed directly into the root gets a paragraph around it.
fn wrap_root_text(root: &mut Node, caret: &Caret) -> Caret {
    if caret.path.depth() == 1
        && let Some(index) = caret.path.last()
        && root.children.get(index).is_some_and(Node::is_text)
    {
        let text = root.children.remove(index);
        root.children.insert(index, Node::paragraph(vec![text]));
        return Caret::new(NodePath::from(vec![index, 0]), caret.offset);
    }
    caret.clone()
}

/// Char ranges of inline code spans within `block`.
fn inline_code_ranges(block: &Node) -> Vec<Range<usize>> {
    fn walk(node: &Node, pos: &mut usize, out: &mut Vec<Range<usize>>) {
        for child in &node.children {
            let len = child.char_len();
            if child.kind == NodeKind::InlineCode {
                out.push(*pos..*pos + len);
                *pos += len;
            } else if child.is_text() {
                *pos += len;
            } else {
                walk(child, pos, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(block, &mut 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::serialize;
    use crate::tree::{ParagraphMarks, outline};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn typed(text: &str) -> (Node, Caret) {
        let root = Node::root(vec![Node::paragraph(vec![Node::text(text)])]);
        let caret = Caret::new(NodePath::from(vec![0, 0]), text.chars().count());
        (root, caret)
    }

    fn run(text: &str, trigger: Trigger) -> (Node, Outcome) {
        let (mut root, caret) = typed(text);
        let outcome = autoformat(&mut root, &caret, trigger).unwrap();
        (root, outcome)
    }

    fn applied_caret(outcome: &Outcome) -> Caret {
        match outcome {
            Outcome::Applied { caret, .. } => caret.clone(),
            other => panic!("expected a transform, got {other:?}"),
        }
    }

    #[test]
    fn test_hash_space_becomes_heading_with_caret_inside() {
        let (root, outcome) = run("# ", Trigger::Keystroke);
        assert_snapshot!(outline(&root), @r#"
        Heading 1
          Text ""
        "#);
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 0]), 0));
    }

    #[test]
    fn test_enter_heading_moves_to_next_line() {
        let (root, outcome) = run("## Hello", Trigger::Enter);
        assert_eq!(serialize(&root).unwrap(), "## Hello\n");
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![1, 0]), 0));
    }

    #[test]
    fn test_thematic_break() {
        let (root, outcome) = run("---", Trigger::Enter);
        assert_snapshot!(outline(&root), @r#"
        ThematicBreak
        Paragraph (placeholder)
          Text ""
        "#);
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![1, 0]), 0));
    }

    #[test]
    fn test_fence_opens_then_closes() {
        let mut root = Node::root(vec![
            Node::paragraph(vec![Node::text("```rust")]),
            Node::paragraph(vec![Node::text("let x = 1;")]),
            Node::paragraph(vec![Node::text("```")]),
        ]);
        let opener = Caret::new(NodePath::from(vec![0, 0]), 7);
        assert_eq!(
            autoformat(&mut root, &opener, Trigger::Keystroke),
            Ok(Outcome::FencePending)
        );
        assert_eq!(
            root.children[0].kind,
            NodeKind::Paragraph(ParagraphMarks {
                placeholder: false,
                fence_open: Some("rust".into()),
            })
        );

        let closer = Caret::new(NodePath::from(vec![2, 0]), 3);
        assert_eq!(
            autoformat(&mut root, &closer, Trigger::Keystroke),
            Ok(Outcome::FullRender(FullRenderReason::FenceClosed))
        );
    }

    #[test]
    fn test_table_row_defers_to_full_render() {
        let (_, outcome) = run("|a|b|", Trigger::Keystroke);
        assert_eq!(outcome, Outcome::FullRender(FullRenderReason::TableRow));
    }

    #[test]
    fn test_bullet_keeps_caret_in_item() {
        let (root, outcome) = run("- a", Trigger::Keystroke);
        assert_snapshot!(outline(&root), @r#"
        List
          ListItem
            Text "a"
        "#);
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 0, 0]), 1));
    }

    #[test]
    fn test_checkbox_item() {
        let (root, outcome) = run("- [ ] ", Trigger::Keystroke);
        assert_snapshot!(outline(&root), @r#"
        List
          ListItem
            Checkbox checked=false
            Text ""
        "#);
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 0, 1]), 0));
        assert_eq!(serialize(&root).unwrap(), "- [ ] \n\n");
    }

    #[test]
    fn test_blockquote() {
        let (root, outcome) = run("> ", Trigger::Keystroke);
        assert_snapshot!(outline(&root), @r#"
        BlockQuote
          Paragraph
            Text ""
        "#);
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 0, 0]), 0));
    }

    #[test]
    fn test_bold_italic_wraps_once() {
        let (root, outcome) = run("***bold*** ", Trigger::Keystroke);
        assert_snapshot!(outline(&root), @r#"
        Paragraph
          Strong
            Emphasis
              Text "bold"
          Text " "
        "#);
        assert_eq!(serialize(&root).unwrap(), "***bold*** \n");
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 1]), 1));
    }

    #[test]
    fn test_emphasis_keeps_surrounding_formatting() {
        let mut root = Node::root(vec![Node::paragraph(vec![
            Node::new(NodeKind::Strong, vec![Node::text("keep")]),
            Node::text(" then *new* "),
        ])]);
        let caret = Caret::new(NodePath::from(vec![0, 1]), 12);
        let outcome = autoformat(&mut root, &caret, Trigger::Keystroke).unwrap();
        assert_snapshot!(outline(&root), @r#"
        Paragraph
          Strong
            Text "keep"
          Text " then "
          Emphasis
            Text "new"
          Text " "
        "#);
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 3]), 1));
    }

    #[test]
    fn test_inline_code_at_end_gets_anchor() {
        let (root, outcome) = run("run `ls`", Trigger::Keystroke);
        let paragraph = &root.children[0];
        assert_eq!(paragraph.children.len(), 3);
        assert_eq!(paragraph.children[1].kind, NodeKind::InlineCode);
        assert_eq!(paragraph.children[2].as_text(), Some("\u{200B}"));
        assert_eq!(applied_caret(&outcome), Caret::new(NodePath::from(vec![0, 2]), 0));
        assert_eq!(serialize(&root).unwrap(), "run `ls`\n");
    }

    #[test]
    fn test_code_block_is_suppressed() {
        let mut root = Node::root(vec![Node::new(
            NodeKind::CodeBlock { language: None },
            vec![Node::text("# not a heading")],
        )]);
        let caret = Caret::new(NodePath::from(vec![0, 0]), 2);
        assert_eq!(
            autoformat(&mut root, &caret, Trigger::Keystroke),
            Ok(Outcome::Suppressed)
        );
    }

    #[test]
    fn test_root_text_is_wrapped() {
        let mut root = Node::root(vec![Node::text("plain")]);
        let caret = Caret::new(NodePath::from(vec![0]), 5);
        let outcome = autoformat(&mut root, &caret, Trigger::Keystroke).unwrap();
        assert_eq!(outcome, Outcome::NoMatch);
        assert_snapshot!(outline(&root), @r#"
        Paragraph
          Text "plain"
        "#);
    }

    #[test]
    fn test_emphasis_inside_heading() {
        let mut root = Node::root(vec![Node::new(
            NodeKind::Heading(2),
            vec![Node::text("a **b** ")],
        )]);
        let caret = Caret::new(NodePath::from(vec![0, 0]), 8);
        let outcome = autoformat(&mut root, &caret, Trigger::Keystroke).unwrap();
        assert!(matches!(outcome, Outcome::Applied { rule: "emphasis", .. }));
        assert_eq!(serialize(&root).unwrap(), "## a **b** \n");
    }

    #[test]
    fn test_heading_markers_inside_heading_do_nothing() {
        let mut root = Node::root(vec![Node::new(NodeKind::Heading(1), vec![Node::text("# x")])]);
        let caret = Caret::new(NodePath::from(vec![0, 0]), 3);
        assert_eq!(
            autoformat(&mut root, &caret, Trigger::Keystroke),
            Ok(Outcome::NoMatch)
        );
    }
}
