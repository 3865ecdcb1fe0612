use serde::{Deserialize, Serialize};

/// Address of a node as child indices from the root. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.0.pop()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut out = self.clone();
        out.push(index);
        out
    }

    pub fn parent(&self) -> Option<Self> {
        self.split_last().map(|(parent, _)| parent)
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn split_last(&self) -> Option<(Self, usize)> {
        let (&last, rest) = self.0.split_last()?;
        Some((Self(rest.to_vec()), last))
    }

    /// Path of the next sibling (which may not exist).
    pub fn next_sibling(&self) -> Option<Self> {
        let (parent, index) = self.split_last()?;
        Some(parent.child(index + 1))
    }

    pub fn prev_sibling(&self) -> Option<Self> {
        let (parent, index) = self.split_last()?;
        index.checked_sub(1).map(|i| parent.child(i))
    }

    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Path relative to `prefix`, if `self` lies below it.
    pub fn strip_prefix(&self, prefix: &NodePath) -> Option<Self> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| Self(rest.to_vec()))
    }

    pub fn join(&self, other: &NodePath) -> Self {
        let mut out = self.clone();
        out.0.extend_from_slice(&other.0);
        out
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_siblings_and_parent() {
        let path = NodePath::from(vec![2, 0, 3]);
        assert_eq!(path.parent(), Some(NodePath::from(vec![2, 0])));
        assert_eq!(path.next_sibling(), Some(NodePath::from(vec![2, 0, 4])));
        assert_eq!(path.prev_sibling(), Some(NodePath::from(vec![2, 0, 2])));
        assert_eq!(NodePath::from(vec![1, 0]).prev_sibling(), None);
        assert_eq!(NodePath::root().parent(), None);
    }

    #[test]
    fn test_prefix_helpers() {
        let block = NodePath::from(vec![4]);
        let text = NodePath::from(vec![4, 1, 0]);
        assert!(text.starts_with(&block));
        assert_eq!(text.strip_prefix(&block), Some(NodePath::from(vec![1, 0])));
        assert_eq!(block.join(&NodePath::from(vec![1, 0])), text);
        assert_eq!(block.strip_prefix(&text), None);
    }
}
