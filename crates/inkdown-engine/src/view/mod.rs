//! # HTML view
//!
//! Projects a document tree onto the HTML a host displays. The markup carries
//! the data attributes the host needs to route widget events back to the
//! session:
//!
//! | Attribute               | On                                  |
//! |-------------------------|-------------------------------------|
//! | `data-cursor-placeholder` | caret placeholder paragraphs      |
//! | `data-code-block-start` | paragraphs holding an open ``` fence |
//! | `data-checkbox-index`   | task checkboxes, in document order  |
//! | `data-original-path`    | images, the path as typed           |
//!
//! All document text is escaped; raw HTML from the source shows as text.

mod highlight;

#[cfg(feature = "syntax-highlighting")]
pub use highlight::SyntectHighlighter;
pub use highlight::{Highlighter, PlainHighlighter, highlight_or_escape};

use crate::tree::{Alignment, ListKind, Node, NodeKind};
use crate::widgets::LANGUAGES;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

/// Render `root` to HTML.
pub fn render_html(root: &Node, highlighter: &dyn Highlighter) -> String {
    let mut renderer = HtmlRenderer {
        out: String::new(),
        checkboxes: 0,
        highlighter,
    };
    renderer.children(root);
    renderer.out
}

struct HtmlRenderer<'a> {
    out: String,
    checkboxes: usize,
    highlighter: &'a dyn Highlighter,
}

impl HtmlRenderer<'_> {
    fn children(&mut self, node: &Node) {
        for child in &node.children {
            self.node(child);
        }
    }

    fn wrap(&mut self, open: &str, node: &Node, close: &str) {
        self.out.push_str(open);
        self.children(node);
        self.out.push_str(close);
    }

    fn node(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Root => self.children(node),
            NodeKind::Paragraph(marks) => {
                let open = if marks.placeholder {
                    "<p data-cursor-placeholder=\"true\">".to_string()
                } else if let Some(language) = &marks.fence_open {
                    format!("<p data-code-block-start=\"{}\">", attr(language))
                } else {
                    "<p>".to_string()
                };
                self.wrap(&open, node, "</p>");
            }
            NodeKind::Heading(level) => {
                self.wrap(&format!("<h{level}>"), node, &format!("</h{level}>"));
            }
            NodeKind::List(ListKind::Unordered) => self.wrap("<ul>", node, "</ul>"),
            NodeKind::List(ListKind::Ordered { start: 1 }) => self.wrap("<ol>", node, "</ol>"),
            NodeKind::List(ListKind::Ordered { start }) => {
                self.wrap(&format!("<ol start=\"{start}\">"), node, "</ol>");
            }
            NodeKind::ListItem => {
                let task = node
                    .children
                    .iter()
                    .any(|c| matches!(c.kind, NodeKind::Checkbox { .. }));
                let open = if task {
                    "<li class=\"task-list-item\">"
                } else {
                    "<li>"
                };
                self.wrap(open, node, "</li>");
            }
            NodeKind::BlockQuote => self.wrap("<blockquote>", node, "</blockquote>"),
            NodeKind::CodeBlock { language } => self.code_block(node, language.as_deref()),
            NodeKind::Table => self.wrap("<table>", node, "</table>"),
            NodeKind::TableHead => self.wrap("<thead>", node, "</thead>"),
            NodeKind::TableBody => self.wrap("<tbody>", node, "</tbody>"),
            NodeKind::TableRow => self.wrap("<tr>", node, "</tr>"),
            NodeKind::TableCell { header, align } => {
                let tag = if *header { "th" } else { "td" };
                let style = match align {
                    Alignment::None => String::new(),
                    Alignment::Left => " style=\"text-align: left\"".to_string(),
                    Alignment::Center => " style=\"text-align: center\"".to_string(),
                    Alignment::Right => " style=\"text-align: right\"".to_string(),
                };
                self.wrap(&format!("<{tag}{style}>"), node, &format!("</{tag}>"));
            }
            NodeKind::ThematicBreak => self.out.push_str("<hr>"),
            NodeKind::Gap => self.out.push('\n'),
            NodeKind::Text(content) => self.out.push_str(&text(content)),
            NodeKind::Emphasis => self.wrap("<em>", node, "</em>"),
            NodeKind::Strong => self.wrap("<strong>", node, "</strong>"),
            NodeKind::InlineCode => self.wrap("<code>", node, "</code>"),
            NodeKind::Link { href } => {
                self.wrap(&format!("<a href=\"{}\">", attr(href)), node, "</a>");
            }
            NodeKind::Image(image) => {
                self.out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\" data-original-path=\"{}\"",
                    attr(&image.src),
                    attr(&image.alt),
                    attr(image.markdown_path())
                ));
                if let Some(width) = image.width {
                    self.out.push_str(&format!(" style=\"width: {width}px\""));
                }
                self.out.push('>');
            }
            NodeKind::Html(html) => self.out.push_str(&text(html)),
            NodeKind::LineBreak => self.out.push_str("<br>"),
            NodeKind::Checkbox { checked } => {
                self.out.push_str(&format!(
                    "<input type=\"checkbox\" data-checkbox-index=\"{}\"{}>",
                    self.checkboxes,
                    if *checked { " checked" } else { "" }
                ));
                self.checkboxes += 1;
            }
            NodeKind::CodeBlockWrapper => {
                self.wrap("<div class=\"code-block-wrapper\">", node, "</div>");
            }
            NodeKind::LanguageSelector { language } => self.language_selector(language.as_deref()),
            NodeKind::ImageWrapper => {
                self.wrap("<span class=\"image-wrapper\">", node, "</span>");
            }
            NodeKind::ResizeHandle => {
                self.out
                    .push_str("<span class=\"resize-handle\" contenteditable=\"false\"></span>");
            }
        }
    }

    fn code_block(&mut self, node: &Node, language: Option<&str>) {
        let code = node.text_content();
        let class = language.unwrap_or("plaintext");
        let body = highlight_or_escape(self.highlighter, &code, language);
        self.out.push_str(&format!(
            "<pre><code class=\"language-{}\">{body}</code></pre>",
            attr(class)
        ));
    }

    fn language_selector(&mut self, current: Option<&str>) {
        let current = current.unwrap_or("plaintext");
        self.out
            .push_str("<select class=\"code-language-selector\" contenteditable=\"false\">");
        for language in LANGUAGES {
            let selected = if *language == current { " selected" } else { "" };
            self.out
                .push_str(&format!("<option value=\"{language}\"{selected}>{language}</option>"));
        }
        self.out.push_str("</select>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse;
    use crate::tree::ParagraphMarks;
    use crate::widgets::attach;
    use pretty_assertions::assert_eq;

    fn html(markdown: &str) -> String {
        render_html(&parse(markdown), &PlainHighlighter)
    }

    #[test]
    fn test_inline_markup_and_escaping() {
        assert_eq!(
            html("a **b** *c* `d` <i>raw</i>\n"),
            "<p>a <strong>b</strong> <em>c</em> <code>d</code> &lt;i&gt;raw&lt;/i&gt;</p>"
        );
    }

    #[test]
    fn test_checkboxes_are_indexed_in_order() {
        let out = html("- [ ] a\n- [x] b\n");
        assert!(out.contains("<input type=\"checkbox\" data-checkbox-index=\"0\">"));
        assert!(out.contains("<input type=\"checkbox\" data-checkbox-index=\"1\" checked>"));
    }

    #[test]
    fn test_image_keeps_original_path_and_width() {
        let out = html("![cat](cat.png =200x)\n");
        assert!(out.contains("data-original-path=\"cat.png\""));
        assert!(out.contains("style=\"width: 200px\""));
    }

    #[test]
    fn test_marked_paragraphs() {
        let root = Node::root(vec![
            Node::placeholder(),
            Node::new(
                NodeKind::Paragraph(ParagraphMarks {
                    placeholder: false,
                    fence_open: Some("js".into()),
                }),
                vec![Node::text("```js")],
            ),
        ]);
        assert_eq!(
            render_html(&root, &PlainHighlighter),
            "<p data-cursor-placeholder=\"true\"></p><p data-code-block-start=\"js\">```js</p>"
        );
    }

    #[test]
    fn test_code_block_with_selector() {
        let mut root = parse("```rust\nlet x = 1 < 2;\n```\n");
        attach(&mut root);
        let out = render_html(&root, &PlainHighlighter);
        assert!(out.starts_with("<div class=\"code-block-wrapper\"><select"));
        assert!(out.contains("<option value=\"rust\" selected>rust</option>"));
        assert!(out.contains("<pre><code class=\"language-rust\">let x = 1 &lt; 2;</code></pre>"));
    }

    #[test]
    fn test_table_alignment() {
        let out = html("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        assert!(out.contains("<th style=\"text-align: left\">a</th>"));
        assert!(out.contains("<td style=\"text-align: right\">2</td>"));
    }
}
