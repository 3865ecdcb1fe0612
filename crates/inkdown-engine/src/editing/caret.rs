//! Caret positions that survive tree mutations.
//!
//! A [`Caret`] points into a text run. Across a structural change it is
//! carried as a plain char offset into the flattened text of the document (or
//! of one block) and resolved back to a text run afterwards.

use crate::tree::{Node, NodeKind, NodePath};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caret {
    /// Path of a `Text` node.
    pub path: NodePath,
    /// Char offset within that text.
    pub offset: usize,
}

impl Caret {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Which text run wins when an offset falls exactly between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// End of the earlier run.
    Backward,
    /// Start of the later run.
    Forward,
}

/// Document-relative char offset of `caret`, or `None` if it no longer
/// points at a text run.
pub fn capture(root: &Node, caret: &Caret) -> Option<usize> {
    offset_within(root, &NodePath::root(), caret)
}

/// Resolve a document-relative offset to a caret. Offsets past the end land
/// at the end of the last text run; a document without text yields `None`.
pub fn restore(root: &Node, offset: usize) -> Option<Caret> {
    resolve_within(root, &NodePath::root(), offset, Bias::Backward)
}

/// Offset of `caret` within the text of the node at `container`.
pub fn offset_within(root: &Node, container: &NodePath, caret: &Caret) -> Option<usize> {
    let scope = root.get(container)?;
    let relative = caret.path.strip_prefix(container)?;
    let mut acc = 0;
    for path in scope.text_paths() {
        let len = scope.get(&path)?.char_len();
        if path == relative {
            return Some(acc + caret.offset.min(len));
        }
        acc += len;
    }
    None
}

pub fn resolve_within(root: &Node, container: &NodePath, offset: usize, bias: Bias) -> Option<Caret> {
    let scope = root.get(container)?;
    let mut acc = 0;
    let mut last = None;
    for path in scope.text_paths() {
        let len = scope.get(&path)?.char_len();
        let hit = match bias {
            Bias::Backward => acc + len >= offset,
            Bias::Forward => acc + len > offset,
        };
        if hit {
            return Some(Caret::new(container.join(&path), offset.saturating_sub(acc)));
        }
        acc += len;
        last = Some((path, len));
    }
    last.map(|(path, len)| Caret::new(container.join(&path), len))
}

/// Caret just after the top-level block at `index`: at the start of the
/// following empty paragraph, or in a new placeholder paragraph.
pub fn place_after_block(root: &mut Node, index: usize) -> Caret {
    let next = index + 1;
    if let Some(block) = root.children.get_mut(next)
        && is_reusable_paragraph(block)
    {
        return caret_at_start(block, NodePath::from(vec![next]));
    }
    let at = next.min(root.children.len());
    root.children.insert(at, Node::placeholder());
    Caret::new(NodePath::from(vec![at, 0]), 0)
}

/// Caret after the last top-level block, reusing a trailing empty paragraph.
pub fn place_at_end(root: &mut Node) -> Caret {
    let last = root.children.len().checked_sub(1);
    match last {
        Some(index) if is_reusable_paragraph(&root.children[index]) => {
            caret_at_start(&mut root.children[index], NodePath::from(vec![index]))
        }
        Some(index) => place_after_block(root, index),
        None => {
            root.children.push(Node::placeholder());
            Caret::new(NodePath::from(vec![0, 0]), 0)
        }
    }
}

fn is_reusable_paragraph(block: &Node) -> bool {
    matches!(block.kind, NodeKind::Paragraph(_))
        && block.is_visibly_empty()
        && !block.children.iter().any(|c| matches!(c.kind, NodeKind::Image(_)))
}

fn caret_at_start(block: &mut Node, block_path: NodePath) -> Caret {
    if let Some(first) = block.text_paths().into_iter().next() {
        return Caret::new(block_path.join(&first), 0);
    }
    block.children.insert(0, Node::text(""));
    Caret::new(block_path.child(0), 0)
}

/// Drop the placeholder mark from any placeholder that gained content.
pub fn clear_filled_placeholders(root: &mut Node) {
    let filled = root.find_all(&|node| {
        matches!(&node.kind, NodeKind::Paragraph(marks) if marks.placeholder)
            && !node.is_visibly_empty()
    });
    for path in filled {
        if let Some(node) = root.get_mut(&path)
            && let NodeKind::Paragraph(marks) = &mut node.kind
        {
            marks.placeholder = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn doc() -> Node {
        Node::root(vec![
            Node::paragraph(vec![
                Node::text("ab"),
                Node::new(NodeKind::Strong, vec![Node::text("cd")]),
            ]),
            Node::leaf(NodeKind::Gap),
            Node::new(NodeKind::Heading(1), vec![Node::text("ef")]),
        ])
    }

    #[rstest]
    #[case(0, vec![0, 0], 0)]
    #[case(2, vec![0, 0], 2)]
    #[case(3, vec![0, 1, 0], 1)]
    #[case(4, vec![0, 1, 0], 2)]
    #[case(5, vec![2, 0], 1)]
    #[case(99, vec![2, 0], 2)]
    fn test_restore(#[case] offset: usize, #[case] path: Vec<usize>, #[case] expected: usize) {
        let caret = restore(&doc(), offset).unwrap();
        assert_eq!(caret, Caret::new(NodePath::from(path), expected));
    }

    #[test]
    fn test_capture_restore_round_trip() {
        let root = doc();
        for offset in 0..=6 {
            let caret = restore(&root, offset).unwrap();
            assert_eq!(capture(&root, &caret), Some(offset));
        }
    }

    #[test]
    fn test_forward_bias_prefers_later_run() {
        let root = doc();
        let caret = resolve_within(&root, &NodePath::from(vec![0]), 2, Bias::Forward).unwrap();
        assert_eq!(caret, Caret::new(NodePath::from(vec![0, 1, 0]), 0));
    }

    #[test]
    fn test_restore_without_text_is_none() {
        let root = Node::root(vec![Node::leaf(NodeKind::ThematicBreak)]);
        assert_eq!(restore(&root, 0), None);
    }

    #[test]
    fn test_capture_stale_caret_is_none() {
        let caret = Caret::new(NodePath::from(vec![7, 0]), 0);
        assert_eq!(capture(&doc(), &caret), None);
    }

    #[test]
    fn test_place_at_end_appends_placeholder() {
        let mut root = doc();
        let caret = place_at_end(&mut root);
        assert_eq!(caret, Caret::new(NodePath::from(vec![3, 0]), 0));
        assert_eq!(root.children[3], Node::placeholder());
    }

    #[test]
    fn test_place_at_end_reuses_empty_paragraph() {
        let mut root = doc();
        root.children.push(Node::paragraph(vec![]));
        let caret = place_at_end(&mut root);
        assert_eq!(caret, Caret::new(NodePath::from(vec![3, 0]), 0));
        assert_eq!(root.children.len(), 4);
        assert_eq!(root.children[3].children, vec![Node::text("")]);
    }

    #[test]
    fn test_place_after_block_in_the_middle() {
        let mut root = doc();
        let caret = place_after_block(&mut root, 0);
        assert_eq!(caret, Caret::new(NodePath::from(vec![1, 0]), 0));
        assert_eq!(root.children[1], Node::placeholder());
        assert_eq!(root.children[2].kind, NodeKind::Gap);
    }

    #[test]
    fn test_clear_filled_placeholders() {
        let mut root = Node::root(vec![
            Node::new(NodeKind::placeholder(), vec![Node::text("typed")]),
            Node::placeholder(),
        ]);
        clear_filled_placeholders(&mut root);
        assert_eq!(root.children[0].kind, NodeKind::paragraph());
        assert_eq!(root.children[1].kind, NodeKind::placeholder());
    }
}
