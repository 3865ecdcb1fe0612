//! Character-range operations over inline content.

use super::{Node, NodeKind};

/// Copy the chars `start..end` of an inline forest, keeping every element
/// that wraps a copied run (so `**a|b**` sliced at `|` gives two `Strong`s).
///
/// Void elements sit between chars and have no length. One at exactly
/// `start` is kept only when `keep_start_voids` is set, one at exactly `end`
/// only when `keep_end_voids` is set. Empty text runs are dropped.
pub fn slice_inlines(
    nodes: &[Node],
    start: usize,
    end: usize,
    keep_start_voids: bool,
    keep_end_voids: bool,
) -> Vec<Node> {
    let mut slicer = Slicer {
        start,
        end,
        keep_start_voids,
        keep_end_voids,
        pos: 0,
    };
    let mut out = Vec::new();
    slicer.slice(nodes, &mut out);
    merge_adjacent_text(&mut out);
    out
}

struct Slicer {
    start: usize,
    end: usize,
    keep_start_voids: bool,
    keep_end_voids: bool,
    pos: usize,
}

impl Slicer {
    fn slice(&mut self, nodes: &[Node], out: &mut Vec<Node>) {
        for node in nodes {
            match &node.kind {
                NodeKind::Text(text) => {
                    let len = text.chars().count();
                    let from = self.start.max(self.pos);
                    let to = self.end.min(self.pos + len);
                    if from < to {
                        let piece: String = text
                            .chars()
                            .skip(from - self.pos)
                            .take(to - from)
                            .collect();
                        out.push(Node::text(piece));
                    }
                    self.pos += len;
                }
                kind if kind.is_chrome() => {}
                kind if kind.is_void() => {
                    let p = self.pos;
                    let after_start = self.start < p || (self.keep_start_voids && self.start == p);
                    let before_end = p < self.end || (self.keep_end_voids && p == self.end);
                    if after_start && before_end {
                        out.push(node.clone());
                    }
                }
                kind => {
                    let mut inner = Vec::new();
                    self.slice(&node.children, &mut inner);
                    if !inner.is_empty() {
                        out.push(Node::new(kind.clone(), inner));
                    }
                }
            }
        }
    }
}

/// Merge neighbouring text runs, recursively.
pub fn merge_adjacent_text(nodes: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        merge_adjacent_text(&mut node.children);
        if let (Some(prev), NodeKind::Text(next)) = (merged.last_mut(), &node.kind)
            && let Some(prev_text) = prev.as_text_mut()
        {
            prev_text.push_str(next);
            continue;
        }
        merged.push(node);
    }
    *nodes = merged;
}
