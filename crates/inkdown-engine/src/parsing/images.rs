//! Image width suffixes and display-path resolution.
//!
//! Markdown stores an explicit image width as `![alt](path =300x)`, which no
//! markdown parser understands. The suffix is lifted into an [`ImageWidths`]
//! table before parsing and re-attached to each image afterwards.

use regex::Regex;
use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static WIDTH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^\s)]+)\s*=(\d+)x?\)").expect("valid image width regex")
});

/// Widths keyed by the path as typed (and its leading-slash twin).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageWidths(HashMap<String, u32>);

impl ImageWidths {
    pub fn get(&self, path: &str) -> Option<u32> {
        self.0.get(path).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, path: &str, width: u32) {
        let twin = match path.strip_prefix('/') {
            Some(stripped) => stripped.to_string(),
            None => format!("/{path}"),
        };
        self.0.insert(path.to_string(), width);
        self.0.insert(twin, width);
    }
}

/// Strip `=WIDTHx` suffixes, returning the plain markdown and the widths found.
pub fn extract_widths(markdown: &str) -> (String, ImageWidths) {
    let mut widths = ImageWidths::default();
    let stripped = WIDTH_SUFFIX.replace_all(markdown, |caps: &regex::Captures| {
        if let Ok(width) = caps[3].parse::<u32>() {
            widths.insert(&caps[2], width);
        }
        format!("![{}]({})", &caps[1], &caps[2])
    });
    (stripped.into_owned(), widths)
}

/// Resolves typed image paths to absolute display URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    /// Notes root directory.
    pub base_path: PathBuf,
    /// The open document, relative to the notes root.
    pub current_file: RelativePathBuf,
}

impl ImageResolver {
    pub fn new(base_path: impl Into<PathBuf>, current_file: impl Into<RelativePathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            current_file: current_file.into(),
        }
    }

    /// Display URL for `src`. Remote and `file://` URLs pass through;
    /// `/x` is relative to the notes root, anything else to the document's folder.
    pub fn resolve(&self, src: &str) -> String {
        if is_absolute_url(src) {
            return src.to_string();
        }
        let relative = match src.strip_prefix('/') {
            Some(from_root) => RelativePath::new(from_root).normalize(),
            None => self
                .current_file
                .parent()
                .unwrap_or_else(|| RelativePath::new(""))
                .join_normalized(src),
        };
        file_url(&relative.to_path(&self.base_path))
    }
}

fn is_absolute_url(src: &str) -> bool {
    ["http://", "https://", "file://", "data:"]
        .iter()
        .any(|scheme| src.starts_with(scheme))
}

fn file_url(path: &Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    format!("file:///{}", display.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_extract_widths_strips_suffix() {
        let (markdown, widths) =
            extract_widths("before ![cat](img/cat.png =300x) and ![dog](dog.png)");
        assert_eq!(markdown, "before ![cat](img/cat.png) and ![dog](dog.png)");
        assert_eq!(widths.get("img/cat.png"), Some(300));
        assert_eq!(widths.get("/img/cat.png"), Some(300));
        assert_eq!(widths.get("dog.png"), None);
    }

    #[test]
    fn test_extract_widths_without_trailing_x() {
        let (markdown, widths) = extract_widths("![a](/a.png=120)");
        assert_eq!(markdown, "![a](/a.png)");
        assert_eq!(widths.get("/a.png"), Some(120));
        assert_eq!(widths.get("a.png"), Some(120));
    }

    #[rstest]
    #[case("https://example.com/a.png", "https://example.com/a.png")]
    #[case("file:///tmp/a.png", "file:///tmp/a.png")]
    #[case("/assets/a.png", "file:///notes/assets/a.png")]
    #[case("a.png", "file:///notes/journal/a.png")]
    #[case("../assets/a.png", "file:///notes/assets/a.png")]
    fn test_resolve(#[case] src: &str, #[case] expected: &str) {
        let resolver = ImageResolver::new("/notes", "journal/today.md");
        assert_eq!(resolver.resolve(src), expected);
    }

    #[test]
    fn test_resolve_for_root_level_file() {
        let resolver = ImageResolver::new("/notes", "index.md");
        assert_eq!(resolver.resolve("pic.png"), "file:///notes/pic.png");
    }
}
