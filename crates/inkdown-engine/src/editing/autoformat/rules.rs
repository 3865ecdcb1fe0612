//! Ordered pattern rules. The first rule that matches a block wins.

use super::Trigger;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmphasisKind {
    Italic,
    Bold,
    BoldItalic,
}

impl EmphasisKind {
    pub fn marker_len(self) -> usize {
        match self {
            EmphasisKind::Italic => 1,
            EmphasisKind::Bold => 2,
            EmphasisKind::BoldItalic => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    Heading { level: u8 },
    ThematicBreak,
    /// A fence opened and closed on one line.
    InlineFence,
    /// A bare ``` line; opens or closes a multi-block fence.
    FenceMarker { language: String },
    Bullet,
    Checkbox { checked: bool },
    BlockQuote,
    TableRow,
    Emphasis(EmphasisKind),
    InlineCode,
}

/// A pattern found in one block's text. Offsets are chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// The consumed syntax plus its content (trailing whitespace excluded).
    pub span: Range<usize>,
    pub kind: MatchKind,
    /// Where the content starts and ends inside `span`.
    pub content: Range<usize>,
    pub captured: String,
}

/// What a matcher sees of the block.
pub struct LineContext<'a> {
    pub text: &'a str,
    pub trigger: Trigger,
    /// Char ranges already formatted as inline code.
    pub code_ranges: &'a [Range<usize>],
    /// Block rules only apply to paragraphs.
    pub block_rules: bool,
}

pub struct Rule {
    pub name: &'static str,
    pub block_level: bool,
    pub matcher: fn(&LineContext<'_>) -> Option<PatternMatch>,
}

pub static RULES: &[Rule] = &[
    Rule {
        name: "heading",
        block_level: true,
        matcher: heading,
    },
    Rule {
        name: "thematic-break",
        block_level: true,
        matcher: thematic_break,
    },
    Rule {
        name: "fence",
        block_level: true,
        matcher: fence,
    },
    Rule {
        name: "list",
        block_level: true,
        matcher: list_item,
    },
    Rule {
        name: "blockquote",
        block_level: true,
        matcher: blockquote,
    },
    Rule {
        name: "table-row",
        block_level: true,
        matcher: table_row,
    },
    Rule {
        name: "emphasis",
        block_level: false,
        matcher: emphasis,
    },
    Rule {
        name: "inline-code",
        block_level: false,
        matcher: inline_code,
    },
];

/// Run the rules in order against a block.
pub fn scan(ctx: &LineContext<'_>) -> Option<(&'static Rule, PatternMatch)> {
    RULES
        .iter()
        .filter(|rule| ctx.block_rules || !rule.block_level)
        .find_map(|rule| (rule.matcher)(ctx).map(|found| (rule, found)))
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("valid pattern ", stringify!($name))));
    };
}

pattern!(HEADING_TYPED, r"^(#{1,6})\s+(.*)$");
pattern!(HEADING_ENTER, r"^(#{1,6})(?:\s+(.*))?$");
pattern!(THEMATIC_BREAK, r"^---\s*$");
pattern!(INLINE_FENCE, r"^```(\w*)(.*?)```$");
pattern!(FENCE_MARKER, r"^```(\w*)\s*$");
pattern!(BULLET, r"^-\s([^\[\]])(.*)$");
pattern!(CHECKBOX, r"^-\s\[([ xX]?)\]\s");
pattern!(BLOCKQUOTE, r"^>\s(.*)$");
pattern!(TABLE_ROW, r"^\|(.+\|)+");
pattern!(BOLD_ITALIC, r"\*\*\*(.+?)\*\*\*(\s|$)");
pattern!(BOLD, r"\*\*(.+?)\*\*(\s|$)");
pattern!(ITALIC, r"\*(.+?)\*(\s|$)");
pattern!(CODE_SPAN, r"`(.+?)`(\s|$)");

/// True while `text` is still a bare opening fence such as ```` ```rust ````.
pub fn is_fence_marker(text: &str) -> bool {
    FENCE_MARKER.is_match(text)
}

fn chars_before(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Convert a byte range of `text` to chars.
fn char_range(text: &str, bytes: Range<usize>) -> Range<usize> {
    chars_before(text, bytes.start)..chars_before(text, bytes.end)
}

fn whole_line(ctx: &LineContext<'_>, kind: MatchKind, content: Range<usize>, captured: &str) -> PatternMatch {
    PatternMatch {
        span: 0..ctx.text.chars().count(),
        kind,
        content,
        captured: captured.to_string(),
    }
}

fn heading(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    let re = match ctx.trigger {
        Trigger::Enter => &*HEADING_ENTER,
        Trigger::Keystroke | Trigger::Paste => &*HEADING_TYPED,
    };
    let caps = re.captures(ctx.text)?;
    let level = u8::try_from(caps.get(1)?.as_str().len()).ok()?;
    // A bare `##` on Enter has no content group.
    let (content, captured) = match caps.get(2) {
        Some(content) => (content.range(), content.as_str()),
        None => (ctx.text.len()..ctx.text.len(), ""),
    };
    Some(whole_line(
        ctx,
        MatchKind::Heading { level },
        char_range(ctx.text, content),
        captured,
    ))
}

fn thematic_break(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    THEMATIC_BREAK
        .is_match(ctx.text)
        .then(|| whole_line(ctx, MatchKind::ThematicBreak, 0..0, ""))
}

fn fence(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    if let Some(caps) = INLINE_FENCE.captures(ctx.text) {
        let body = caps.get(2)?;
        return Some(whole_line(
            ctx,
            MatchKind::InlineFence,
            char_range(ctx.text, body.range()),
            body.as_str(),
        ));
    }
    let caps = FENCE_MARKER.captures(ctx.text)?;
    let language = caps.get(1)?.as_str();
    Some(whole_line(
        ctx,
        MatchKind::FenceMarker {
            language: language.to_string(),
        },
        0..0,
        language,
    ))
}

fn list_item(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    if let Some(caps) = CHECKBOX.captures(ctx.text) {
        let marker = caps.get(0)?;
        let checked = caps.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case("x"));
        let start = chars_before(ctx.text, marker.end());
        let total = ctx.text.chars().count();
        return Some(whole_line(
            ctx,
            MatchKind::Checkbox { checked },
            start..total,
            &ctx.text[marker.end()..],
        ));
    }
    let caps = BULLET.captures(ctx.text)?;
    let first = caps.get(1)?;
    let start = chars_before(ctx.text, first.start());
    Some(whole_line(
        ctx,
        MatchKind::Bullet,
        start..ctx.text.chars().count(),
        &ctx.text[first.start()..],
    ))
}

fn blockquote(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    let caps = BLOCKQUOTE.captures(ctx.text)?;
    let content = caps.get(1)?;
    Some(whole_line(
        ctx,
        MatchKind::BlockQuote,
        char_range(ctx.text, content.range()),
        content.as_str(),
    ))
}

fn table_row(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    TABLE_ROW
        .is_match(ctx.text)
        .then(|| whole_line(ctx, MatchKind::TableRow, 0..0, ctx.text))
}

fn emphasis(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    let (re, kind) = if ctx.text.contains("***") {
        (&*BOLD_ITALIC, EmphasisKind::BoldItalic)
    } else if ctx.text.contains("**") {
        (&*BOLD, EmphasisKind::Bold)
    } else {
        (&*ITALIC, EmphasisKind::Italic)
    };
    delimited(ctx, re, MatchKind::Emphasis(kind), kind.marker_len())
}

fn inline_code(ctx: &LineContext<'_>) -> Option<PatternMatch> {
    if ctx.text.contains("```") {
        return None;
    }
    delimited(ctx, &CODE_SPAN, MatchKind::InlineCode, 1)
}

/// First `marker content marker` span that does not touch existing inline code.
fn delimited(ctx: &LineContext<'_>, re: &Regex, kind: MatchKind, marker: usize) -> Option<PatternMatch> {
    re.captures_iter(ctx.text).find_map(|caps| {
        let inner = caps.get(1)?;
        let whole = caps.get(0)?;
        let closer_end = inner.end() + marker;
        let span = char_range(ctx.text, whole.start()..closer_end);
        let overlaps_code = ctx
            .code_ranges
            .iter()
            .any(|code| code.start < span.end && span.start < code.end);
        (!overlaps_code).then(|| PatternMatch {
            content: char_range(ctx.text, inner.range()),
            span,
            kind: kind.clone(),
            captured: inner.as_str().to_string(),
        })
    })
}
