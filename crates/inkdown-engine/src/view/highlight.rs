//! Code highlighting collaborators for the HTML view.

/// Turns code into highlighted HTML. Best effort: `None` means the caller
/// shows escaped raw text instead.
pub trait Highlighter {
    fn highlight(&self, code: &str, language: &str) -> Option<String>;
    fn highlight_auto(&self, code: &str) -> Option<String>;
}

/// Highlighted HTML for `code`, or the escaped code when highlighting fails.
pub fn highlight_or_escape(
    highlighter: &dyn Highlighter,
    code: &str,
    language: Option<&str>,
) -> String {
    let highlighted = match language {
        Some(language) => highlighter.highlight(code, language),
        None => highlighter.highlight_auto(code),
    };
    highlighted.unwrap_or_else(|| {
        log::debug!("no highlighting for {language:?}, showing raw code");
        html_escape::encode_text(code).into_owned()
    })
}

/// Escapes only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, code: &str, _language: &str) -> Option<String> {
        Some(html_escape::encode_text(code).into_owned())
    }

    fn highlight_auto(&self, code: &str) -> Option<String> {
        Some(html_escape::encode_text(code).into_owned())
    }
}

#[cfg(feature = "syntax-highlighting")]
pub use syntect_impl::SyntectHighlighter;

#[cfg(feature = "syntax-highlighting")]
mod syntect_impl {
    use super::Highlighter;
    use std::sync::LazyLock;
    use syntect::html::{ClassStyle, ClassedHTMLGenerator};
    use syntect::parsing::{SyntaxReference, SyntaxSet};
    use syntect::util::LinesWithEndings;

    static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

    /// Class-based highlighting with syntect's bundled grammars. Styling is
    /// left to the host's stylesheet.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SyntectHighlighter;

    impl SyntectHighlighter {
        fn render(&self, code: &str, syntax: &SyntaxReference) -> Option<String> {
            let mut generator =
                ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
            for line in LinesWithEndings::from(code) {
                if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                    log::warn!("highlighting failed: {e}");
                    return None;
                }
            }
            Some(generator.finalize())
        }
    }

    impl Highlighter for SyntectHighlighter {
        fn highlight(&self, code: &str, language: &str) -> Option<String> {
            let syntax = SYNTAX_SET
                .find_syntax_by_token(language)
                .or_else(|| SYNTAX_SET.find_syntax_by_extension(language))?;
            self.render(code, syntax)
        }

        fn highlight_auto(&self, code: &str) -> Option<String> {
            let syntax = SYNTAX_SET.find_syntax_by_first_line(code)?;
            self.render(code, syntax)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Failing;

    impl Highlighter for Failing {
        fn highlight(&self, _: &str, _: &str) -> Option<String> {
            None
        }
        fn highlight_auto(&self, _: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_failure_falls_back_to_escaped_text() {
        let html = highlight_or_escape(&Failing, "a < b && c", Some("nope"));
        assert_eq!(html, "a &lt; b &amp;&amp; c");
    }

    #[test]
    fn test_plain_escapes() {
        assert_eq!(
            highlight_or_escape(&PlainHighlighter, "<b>", None),
            "&lt;b&gt;"
        );
    }

    #[cfg(feature = "syntax-highlighting")]
    #[test]
    fn test_syntect_marks_up_known_language() {
        let html = SyntectHighlighter.highlight("fn main() {}", "rust").unwrap();
        assert!(html.contains("<span class="));
        assert!(html.contains("main"));
    }

    #[cfg(feature = "syntax-highlighting")]
    #[test]
    fn test_syntect_unknown_language_is_none() {
        assert_eq!(SyntectHighlighter.highlight("x", "no-such-language"), None);
    }
}
