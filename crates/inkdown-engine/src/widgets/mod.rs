//! # Interactive widgets
//!
//! Checkboxes, resizable images and code-block language selectors layered
//! onto a rendered tree. Widget edits never mutate the tree directly: each
//! rewrites the markdown source ([`checkbox`], [`image`], [`code_language`])
//! and the session re-renders from it.

pub mod checkbox;
pub mod code_language;
pub mod image;

use crate::tree::{Node, NodeKind};

/// Languages offered by the code-block selector.
pub const LANGUAGES: &[&str] = &[
    "plaintext",
    "javascript",
    "typescript",
    "python",
    "java",
    "csharp",
    "cpp",
    "c",
    "php",
    "ruby",
    "go",
    "rust",
    "swift",
    "kotlin",
    "sql",
    "bash",
    "powershell",
    "html",
    "css",
    "scss",
    "json",
    "xml",
    "yaml",
    "markdown",
    "diff",
];

/// Wrap code blocks with a language selector and images with a resize
/// handle. Already-wrapped nodes are left alone.
pub fn attach(root: &mut Node) {
    attach_children(root);
}

fn attach_children(node: &mut Node) {
    let wrapper_kind = node.kind.clone();
    for child in node.children.iter_mut() {
        match &child.kind {
            NodeKind::CodeBlock { language } if wrapper_kind != NodeKind::CodeBlockWrapper => {
                let selector = Node::leaf(NodeKind::LanguageSelector {
                    language: language.clone(),
                });
                let code = std::mem::replace(child, Node::leaf(NodeKind::CodeBlockWrapper));
                child.children = vec![selector, code];
            }
            NodeKind::Image(_) if wrapper_kind != NodeKind::ImageWrapper => {
                let image = std::mem::replace(child, Node::leaf(NodeKind::ImageWrapper));
                child.children = vec![image, Node::leaf(NodeKind::ResizeHandle)];
            }
            _ => attach_children(child),
        }
    }
}
