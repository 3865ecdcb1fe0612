//! The editable surface: a document tree plus a caret, with the primitive
//! editing operations a rich-text widget performs natively.

use crate::editing::autoformat::rules::is_fence_marker;
use crate::editing::caret::{self, Bias, Caret};
use crate::tree::{CARET_ANCHOR, Node, NodeKind, NodePath, merge_adjacent_text, slice_inlines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub root: Node,
    pub caret: Option<Caret>,
    pub editable: bool,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(Node::root(Vec::new()))
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map_or(text.len(), |(byte, _)| byte)
}

fn is_text_block(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Paragraph(_)
            | NodeKind::Heading(_)
            | NodeKind::ListItem
            | NodeKind::TableCell { .. }
            | NodeKind::CodeBlock { .. }
    )
}

impl Surface {
    pub fn new(root: Node) -> Self {
        Self {
            root,
            caret: None,
            editable: false,
        }
    }

    /// Visible text of the whole surface.
    pub fn text(&self) -> String {
        self.root.text_content()
    }

    /// Caret if it still points at a text run.
    pub fn valid_caret(&self) -> Option<Caret> {
        self.caret
            .clone()
            .filter(|c| self.root.get(&c.path).is_some_and(Node::is_text))
    }

    /// Caret for typing, synthesising a text run if there is none.
    fn ensure_caret(&mut self) -> Caret {
        if let Some(caret) = self.valid_caret() {
            return caret;
        }
        let caret = if self.root.children.is_empty() {
            self.root.children.push(Node::text(""));
            Caret::new(NodePath::from(vec![0]), 0)
        } else {
            caret::restore(&self.root, usize::MAX).unwrap_or_else(|| caret::place_at_end(&mut self.root))
        };
        self.caret = Some(caret.clone());
        caret
    }

    pub fn set_caret(&mut self, caret: Caret) {
        self.caret = Some(caret);
    }

    /// Document-relative offset of the caret.
    pub fn caret_offset(&self) -> Option<usize> {
        caret::capture(&self.root, self.caret.as_ref()?)
    }

    pub fn insert_text(&mut self, text: &str) {
        let caret = self.ensure_caret();
        let Some(run) = self.root.get_mut(&caret.path).and_then(Node::as_text_mut) else {
            return;
        };
        let at = byte_index(run, caret.offset);
        run.insert_str(at, text);
        self.caret = Some(Caret::new(caret.path, caret.offset + text.chars().count()));
        caret::clear_filled_placeholders(&mut self.root);
        clear_stale_fences(&mut self.root);
    }

    /// Shift+Enter: a line break inside the current block.
    pub fn insert_line_break(&mut self) {
        let caret = self.ensure_caret();
        let Some((parent_path, index)) = caret.path.split_last() else {
            return;
        };
        let Some(run) = self.root.get(&caret.path).and_then(Node::as_text) else {
            return;
        };
        let at = byte_index(run, caret.offset);
        let (before, after) = (run[..at].to_string(), run[at..].to_string());

        let mut replacement = Vec::with_capacity(3);
        if !before.is_empty() {
            replacement.push(Node::text(before));
        }
        replacement.push(Node::leaf(NodeKind::LineBreak));
        replacement.push(Node::text(after));
        let after_index = index + replacement.len() - 1;

        if let Some(parent) = self.root.get_mut(&parent_path) {
            parent.children.splice(index..=index, replacement);
            self.caret = Some(Caret::new(parent_path.child(after_index), 0));
        }
    }

    /// Plain Enter: split the paragraph or heading at the caret. The second
    /// half is always a plain paragraph.
    pub fn split_block(&mut self) {
        let caret = self.ensure_caret();
        if self
            .root
            .closest(&caret.path, |k| matches!(k, NodeKind::CodeBlock { .. }))
            .is_some()
        {
            self.insert_text("\n");
            return;
        }
        let Some(block_path) = self
            .root
            .closest(&caret.path, |k| matches!(k, NodeKind::Paragraph(_) | NodeKind::Heading(_)))
        else {
            self.insert_line_break();
            return;
        };
        let Some(block) = self.root.get(&block_path).cloned() else {
            return;
        };
        let offset = caret::offset_within(&self.root, &block_path, &caret).unwrap_or(0);
        let total = block.char_len();

        let mut first = slice_inlines(&block.children, 0, offset, true, true);
        if !first.iter().any(has_text) {
            first.push(Node::text(""));
        }
        let mut second = slice_inlines(&block.children, offset, total, false, true);
        if !second.iter().any(has_text) {
            second.insert(0, Node::text(""));
        }
        let kind = if second.iter().all(|n| n.is_text() && n.is_visibly_empty()) {
            NodeKind::placeholder()
        } else {
            NodeKind::paragraph()
        };

        let Some(next_path) = block_path.next_sibling() else {
            return;
        };
        self.root.replace(&block_path, Node::new(block.kind.clone(), first));
        let second = Node::new(kind, second);
        let first_text = second.text_paths().into_iter().next();
        if self.root.insert(&next_path, second).is_some()
            && let Some(first_text) = first_text
        {
            self.caret = Some(Caret::new(next_path.join(&first_text), 0));
        }
    }

    /// Backspace. Returns false when there was nothing to delete.
    pub fn delete_backward(&mut self) -> bool {
        let deleted = self.delete_at_caret();
        if deleted {
            clear_stale_fences(&mut self.root);
        }
        deleted
    }

    fn delete_at_caret(&mut self) -> bool {
        let Some(caret) = self.valid_caret() else {
            return false;
        };

        if caret.offset > 0 {
            return self.delete_char_before(&caret);
        }

        if let Some(prev) = caret.path.prev_sibling()
            && self.root.get(&prev).is_some_and(|n| n.kind.is_void())
        {
            self.root.remove(&prev);
            self.caret = Some(Caret::new(prev, 0));
            return true;
        }

        let Some(block_path) = self.root.closest(&caret.path, is_text_block) else {
            return false;
        };
        let offset = caret::offset_within(&self.root, &block_path, &caret).unwrap_or(0);
        if offset > 0 {
            return match caret::resolve_within(&self.root, &block_path, offset, Bias::Backward) {
                Some(target) => self.delete_char_before(&target),
                None => false,
            };
        }
        self.merge_with_previous_block(&block_path)
    }

    fn delete_char_before(&mut self, caret: &Caret) -> bool {
        let Some(run) = self.root.get_mut(&caret.path).and_then(Node::as_text_mut) else {
            return false;
        };
        if caret.offset == 0 {
            return false;
        }
        let start = byte_index(run, caret.offset - 1);
        let end = byte_index(run, caret.offset);
        run.replace_range(start..end, "");
        self.caret = Some(Caret::new(caret.path.clone(), caret.offset - 1));
        true
    }

    fn merge_with_previous_block(&mut self, block_path: &NodePath) -> bool {
        let Some(block) = self.root.get(block_path) else {
            return false;
        };
        if !matches!(block.kind, NodeKind::Paragraph(_) | NodeKind::Heading(_)) {
            return false;
        }
        let block_empty = block.is_visibly_empty();
        let Some(prev_path) = block_path.prev_sibling() else {
            return false;
        };
        let Some(prev) = self.root.get(&prev_path) else {
            return false;
        };
        let prev_len = prev.char_len();
        let prev_kind = prev.kind.clone();

        match prev_kind {
            NodeKind::Gap | NodeKind::ThematicBreak => {
                self.root.remove(&prev_path);
                if let Some(caret) = self.valid_caret_after_removal(block_path) {
                    self.caret = Some(caret);
                }
                true
            }
            NodeKind::Paragraph(_) | NodeKind::Heading(_) => {
                let Some(moved) = self.root.remove(block_path) else {
                    return false;
                };
                let Some(target) = self.root.get_mut(&prev_path) else {
                    return false;
                };
                target.children.extend(moved.children);
                target.children.retain(|c| c.as_text() != Some(""));
                if target.children.is_empty() {
                    target.children.push(Node::text(""));
                }
                merge_adjacent_text(&mut target.children);
                self.caret = caret::resolve_within(&self.root, &prev_path, prev_len, Bias::Backward);
                true
            }
            _ if block_empty => {
                self.root.remove(block_path);
                self.caret = caret::resolve_within(&self.root, &prev_path, usize::MAX, Bias::Backward);
                true
            }
            _ => false,
        }
    }

    /// Caret for the block that moved up one slot after its predecessor was removed.
    fn valid_caret_after_removal(&self, old_block_path: &NodePath) -> Option<Caret> {
        let caret = self.caret.clone()?;
        let new_block = old_block_path.prev_sibling()?;
        let inner = caret.path.strip_prefix(old_block_path)?;
        Some(Caret::new(new_block.join(&inner), caret.offset))
    }

    pub fn move_left(&mut self) {
        if let Some(offset) = self.caret_offset() {
            self.caret = caret::restore(&self.root, offset.saturating_sub(1)).or(self.caret.take());
        }
    }

    pub fn move_right(&mut self) {
        if let Some(offset) = self.caret_offset() {
            self.caret = caret::restore(&self.root, offset + 1).or(self.caret.take());
        }
    }

    /// ArrowDown on the last line of a code block moves to the block after it.
    /// Returns false when the key should be left alone.
    pub fn exit_code_block_down(&mut self) -> bool {
        let Some(caret) = self.valid_caret() else {
            return false;
        };
        let Some(code_path) = self
            .root
            .closest(&caret.path, |k| matches!(k, NodeKind::CodeBlock { .. }))
        else {
            return false;
        };
        let Some(code) = self.root.get(&code_path) else {
            return false;
        };
        let offset = caret::offset_within(&self.root, &code_path, &caret).unwrap_or(0);
        if code.text_content().chars().skip(offset).any(|c| c == '\n') {
            return false;
        }
        let Some(&top) = code_path.indices().first() else {
            return false;
        };

        let next = (top + 1..self.root.children.len())
            .find(|&i| self.root.children[i].kind != NodeKind::Gap);
        if let Some(index) = next
            && matches!(
                self.root.children[index].kind,
                NodeKind::Paragraph(_) | NodeKind::Heading(_)
            )
        {
            let block = &mut self.root.children[index];
            let inner = match block.text_paths().into_iter().next() {
                Some(path) => path,
                None => {
                    block.children.insert(0, Node::text(""));
                    NodePath::from(vec![0])
                }
            };
            self.caret = Some(Caret::new(NodePath::from(vec![index]).join(&inner), 0));
            return true;
        }

        self.root.children.insert(top + 1, Node::placeholder());
        self.caret = Some(Caret::new(NodePath::from(vec![top + 1, 0]), 0));
        true
    }

    /// Enter inside a list item. Returns false when the caret is not in one.
    pub fn enter_in_list_item(&mut self) -> bool {
        let Some(caret) = self.valid_caret() else {
            return false;
        };
        let Some(item_path) = self.root.closest(&caret.path, |k| *k == NodeKind::ListItem) else {
            return false;
        };
        let Some(item) = self.root.get(&item_path) else {
            return false;
        };
        let Some((list_path, item_index)) = item_path.split_last() else {
            return false;
        };

        if item.text_content().trim().is_empty() {
            self.root.remove(&item_path);
            let list_emptied = self.root.get(&list_path).is_some_and(|l| l.children.is_empty());
            let at = if list_emptied {
                self.root.remove(&list_path);
                list_path
            } else {
                match list_path.next_sibling() {
                    Some(path) => path,
                    None => return false,
                }
            };
            self.root.insert(&at, Node::placeholder());
            self.caret = Some(Caret::new(at.child(0), 0));
            return true;
        }

        let mut children = Vec::new();
        if has_checkbox(item) {
            children.push(Node::leaf(NodeKind::Checkbox { checked: false }));
        }
        children.push(Node::text(""));
        let text_index = children.len() - 1;
        let at = list_path.child(item_index + 1);
        self.root.insert(&at, Node::new(NodeKind::ListItem, children));
        self.caret = Some(Caret::new(at.child(text_index), 0));
        true
    }

    /// Enter inside a blockquote. Returns false when the caret is not in one.
    pub fn enter_in_blockquote(&mut self) -> bool {
        let Some(caret) = self.valid_caret() else {
            return false;
        };
        let Some(quote_path) = self.root.closest(&caret.path, |k| *k == NodeKind::BlockQuote) else {
            return false;
        };
        let paragraph_path = self
            .root
            .closest(&caret.path, |k| matches!(k, NodeKind::Paragraph(_)))
            .filter(|p| p.starts_with(&quote_path) && *p != quote_path);
        let Some(paragraph_path) = paragraph_path else {
            let Some(quote) = self.root.get_mut(&quote_path) else {
                return false;
            };
            quote.children.push(Node::paragraph(vec![Node::text("")]));
            let index = quote.children.len() - 1;
            self.caret = Some(Caret::new(quote_path.child(index).child(0), 0));
            return true;
        };

        let empty = self
            .root
            .get(&paragraph_path)
            .is_some_and(Node::is_visibly_empty);
        if empty {
            self.root.remove(&paragraph_path);
            let quote_emptied = self.root.get(&quote_path).is_some_and(Node::is_visibly_empty);
            let at = if quote_emptied {
                self.root.remove(&quote_path);
                quote_path
            } else {
                match quote_path.next_sibling() {
                    Some(path) => path,
                    None => return false,
                }
            };
            self.root.insert(&at, Node::placeholder());
            self.caret = Some(Caret::new(at.child(0), 0));
            return true;
        }

        let Some(at) = paragraph_path.next_sibling() else {
            return false;
        };
        self.root.insert(&at, Node::paragraph(vec![Node::text("")]));
        self.caret = Some(Caret::new(at.child(0), 0));
        true
    }
}

fn has_text(node: &Node) -> bool {
    node.is_text() || !node.text_paths().is_empty()
}

fn has_checkbox(item: &Node) -> bool {
    item.find(&|n| matches!(n.kind, NodeKind::Checkbox { .. })).is_some()
}

/// A paragraph waiting for its closing fence stops waiting once its text is
/// no longer an opening fence.
fn clear_stale_fences(root: &mut Node) {
    let stale = root.find_all(&|node| {
        matches!(&node.kind, NodeKind::Paragraph(marks) if marks.fence_open.is_some())
            && !is_fence_marker(&node.text_content().replace(CARET_ANCHOR, ""))
    });
    for path in stale {
        if let Some(node) = root.get_mut(&path)
            && let NodeKind::Paragraph(marks) = &mut node.kind
        {
            log::debug!("fence mark cleared at {path:?}");
            marks.fence_open = None;
        }
    }
}
