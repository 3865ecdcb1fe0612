//! Checkbox toggling through the markdown source.

use crate::tree::{Node, NodeKind, NodePath};
use regex::Regex;
use std::sync::LazyLock;

static CHECKBOX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:>\s*)*(?:[-*+]|\d{1,9}[.)])\s+\[( |x|X)\](?:\s|$)")
        .expect("valid checkbox regex")
});

/// Flip the `index`th task marker of `source` (0-based, lines inside fenced
/// code not counted). Any bullet, ordered marker or quoted item counts, in
/// document order. Returns the new source and the new state, or `None` when
/// there is no such checkbox.
pub fn toggle_nth(source: &str, index: usize) -> Option<(String, bool)> {
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();
    let mut in_fence = false;
    let mut seen = 0;

    for line in lines.iter_mut() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some((state, was_checked)) = CHECKBOX_LINE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| (m.range(), m.as_str().eq_ignore_ascii_case("x")))
        else {
            continue;
        };
        if seen < index {
            seen += 1;
            continue;
        }
        line.replace_range(state, if was_checked { " " } else { "x" });
        return Some((lines.join("\n"), !was_checked));
    }
    None
}

/// Position of the checkbox at `path` among all checkboxes of the document.
pub fn index_of(root: &Node, path: &NodePath) -> Option<usize> {
    root.find_all(&|n| matches!(n.kind, NodeKind::Checkbox { .. }))
        .iter()
        .position(|p| p == path)
}
