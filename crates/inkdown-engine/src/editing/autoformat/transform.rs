use super::rules::{EmphasisKind, MatchKind, PatternMatch};
use super::{FullRenderReason, Outcome, Trigger};
use crate::editing::caret::{self, Bias, Caret};
use crate::error::TransformError;
use crate::tree::{CARET_ANCHOR, ListKind, Node, NodeKind, NodePath, merge_adjacent_text, slice_inlines};

pub(super) fn apply(
    root: &mut Node,
    container: &NodePath,
    cursor: usize,
    rule: &'static str,
    found: &PatternMatch,
    trigger: Trigger,
) -> Result<Outcome, TransformError> {
    let outcome = match &found.kind {
        MatchKind::Heading { level } => {
            let content = content_of(root, container, found)?;
            replace(root, container, Node::new(NodeKind::Heading(*level), content))?;
            // Enter on "## Hello" finishes the heading and moves on.
            let caret = if trigger == Trigger::Enter {
                place_after(root, container)?
            } else {
                caret_in(root, container, cursor, found.content.start)?
            };
            Outcome::Applied { rule, caret }
        }
        MatchKind::ThematicBreak => {
            replace(root, container, Node::leaf(NodeKind::ThematicBreak))?;
            Outcome::Applied {
                rule,
                caret: place_after(root, container)?,
            }
        }
        MatchKind::InlineFence => Outcome::FullRender(FullRenderReason::InlineFence),
        MatchKind::FenceMarker { language } => fence_marker(root, container, language)?,
        MatchKind::Bullet | MatchKind::Checkbox { .. } => {
            let mut item = Vec::new();
            if let MatchKind::Checkbox { checked } = found.kind {
                item.push(Node::leaf(NodeKind::Checkbox { checked }));
            }
            item.extend(content_of(root, container, found)?);
            let list = Node::new(
                NodeKind::List(ListKind::Unordered),
                vec![Node::new(NodeKind::ListItem, item)],
            );
            replace(root, container, list)?;
            Outcome::Applied {
                rule,
                caret: caret_in(root, &container.child(0), cursor, found.content.start)?,
            }
        }
        MatchKind::BlockQuote => {
            let paragraph = Node::paragraph(content_of(root, container, found)?);
            replace(root, container, Node::new(NodeKind::BlockQuote, vec![paragraph]))?;
            Outcome::Applied {
                rule,
                caret: caret_in(root, &container.child(0), cursor, found.content.start)?,
            }
        }
        MatchKind::TableRow => Outcome::FullRender(FullRenderReason::TableRow),
        MatchKind::Emphasis(kind) => {
            let kind = *kind;
            wrap_inline(root, container, cursor, found, rule, |inner| match kind {
                EmphasisKind::Italic => Node::new(NodeKind::Emphasis, inner),
                EmphasisKind::Bold => Node::new(NodeKind::Strong, inner),
                EmphasisKind::BoldItalic => Node::new(
                    NodeKind::Strong,
                    vec![Node::new(NodeKind::Emphasis, inner)],
                ),
            })?
        }
        MatchKind::InlineCode => wrap_inline(root, container, cursor, found, rule, |inner| {
            let code: String = inner.iter().map(Node::text_content).collect();
            Node::new(NodeKind::InlineCode, vec![Node::text(code)])
        })?,
    };

    if let Outcome::Applied { .. } = outcome {
        ensure_not_emptied(root, container, rule)?;
    }
    Ok(outcome)
}

fn block<'a>(root: &'a Node, path: &NodePath) -> Result<&'a Node, TransformError> {
    root.get(path).ok_or(TransformError::MissingNode)
}

fn replace(root: &mut Node, path: &NodePath, node: Node) -> Result<(), TransformError> {
    root.replace(path, node).map(|_| ()).ok_or(TransformError::MissingNode)
}

/// Inline nodes of the match's content range, formatting preserved.
fn content_of(root: &Node, container: &NodePath, found: &PatternMatch) -> Result<Vec<Node>, TransformError> {
    let children = &block(root, container)?.children;
    let content = slice_inlines(children, found.content.start, found.content.end, true, true);
    if content.iter().any(Node::is_text) {
        Ok(content)
    } else {
        let mut content = content;
        content.push(Node::text(""));
        Ok(content)
    }
}

/// Caret at `cursor` minus the `consumed` marker chars, inside `scope`.
fn caret_in(root: &Node, scope: &NodePath, cursor: usize, consumed: usize) -> Result<Caret, TransformError> {
    caret::resolve_within(root, scope, cursor.saturating_sub(consumed), Bias::Backward)
        .ok_or(TransformError::MissingNode)
}

/// Caret in a fresh placeholder right after the node at `path`.
fn place_after(root: &mut Node, path: &NodePath) -> Result<Caret, TransformError> {
    let (parent, index) = path.split_last().ok_or(TransformError::MissingNode)?;
    if parent.is_root() {
        return Ok(caret::place_after_block(root, index));
    }
    let at = parent.child(index + 1);
    root.insert(&at, Node::placeholder()).ok_or(TransformError::MissingNode)?;
    Ok(Caret::new(at.child(0), 0))
}

fn fence_marker(root: &mut Node, container: &NodePath, language: &str) -> Result<Outcome, TransformError> {
    let (parent_path, index) = container.split_last().ok_or(TransformError::MissingNode)?;
    let parent = block(root, &parent_path)?;
    let closes_pending = parent.children[..index.min(parent.children.len())]
        .iter()
        .any(|sibling| matches!(&sibling.kind, NodeKind::Paragraph(marks) if marks.fence_open.is_some()));
    if closes_pending {
        return Ok(Outcome::FullRender(FullRenderReason::FenceClosed));
    }
    let node = root.get_mut(container).ok_or(TransformError::MissingNode)?;
    if let NodeKind::Paragraph(marks) = &mut node.kind {
        marks.fence_open = Some(language.to_string());
    }
    Ok(Outcome::FencePending)
}

/// Split the block into prefix, wrapped match and suffix.
fn wrap_inline(
    root: &mut Node,
    container: &NodePath,
    cursor: usize,
    found: &PatternMatch,
    rule: &'static str,
    wrap: impl FnOnce(Vec<Node>) -> Node,
) -> Result<Outcome, TransformError> {
    let children = block(root, container)?.children.clone();
    let total: usize = children.iter().map(Node::char_len).sum();
    let span = &found.span;
    let content = &found.content;

    let prefix = slice_inlines(&children, 0, span.start, true, true);
    let inner = slice_inlines(&children, content.start, content.end, false, false);
    let mut suffix = slice_inlines(&children, span.end, total, true, true);
    if !suffix.first().is_some_and(Node::is_text) {
        suffix.insert(0, Node::text(CARET_ANCHOR.to_string()));
    }

    let mut rebuilt = prefix;
    rebuilt.push(wrap(inner));
    rebuilt.extend(suffix);
    merge_adjacent_text(&mut rebuilt);
    root.get_mut(container).ok_or(TransformError::MissingNode)?.children = rebuilt;

    let opening = content.start - span.start;
    let closing = span.end - content.end;
    let consumed = cursor.saturating_sub(span.start).min(opening)
        + cursor.saturating_sub(content.end).min(closing);
    let caret = caret::resolve_within(root, container, cursor.saturating_sub(consumed), Bias::Forward)
        .ok_or(TransformError::MissingNode)?;
    Ok(Outcome::Applied { rule, caret })
}

/// A transform must leave something where the block was.
fn ensure_not_emptied(root: &Node, container: &NodePath, rule: &'static str) -> Result<(), TransformError> {
    match root.get(container) {
        Some(node) if !node.children.is_empty() || node.kind.is_void() => Ok(()),
        _ => Err(TransformError::EmptiedBlock { rule }),
    }
}
