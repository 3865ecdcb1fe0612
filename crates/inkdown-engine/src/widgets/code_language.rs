//! Rewrite the language tag of a fenced block, located by its content.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w*)\n([\s\S]*?)\n```").expect("valid fenced block regex"));

/// Set the language of the first fenced block whose trimmed content equals
/// `code`'s. Blocks with identical content cannot be told apart; the first
/// one wins. Returns `None` if no block matches or the result would be empty.
pub fn set_language(source: &str, code: &str, language: &str) -> Option<String> {
    let wanted = code.trim();
    let caps = FENCED_BLOCK
        .captures_iter(source)
        .find(|caps| caps.get(2).is_some_and(|body| body.as_str().trim() == wanted))?;
    let whole = caps.get(0)?;
    let body = caps.get(2)?.as_str();
    let tag = if language == "plaintext" { "" } else { language };

    let updated = format!(
        "{}```{tag}\n{body}\n```{}",
        &source[..whole.start()],
        &source[whole.end()..]
    );
    if updated.trim().is_empty() {
        log::error!("language update would empty the document");
        return None;
    }
    Some(updated)
}
