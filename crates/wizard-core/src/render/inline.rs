//! Escaping and span-level formatting.
//!
//! [`format_inline`] expects text that already went through [`escape_html`];
//! it only wraps spans in tags and never escapes again.

use std::sync::LazyLock;
use regex::Regex;

static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*").expect("bold regex is invalid"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([^_\n]+?)__").expect("bold regex is invalid"));
static ITALIC_STAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([^*\s](?:[^*\n]*?[^*\s])?)\*").expect("italic regex is invalid")
});
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_([^_\n]+?)_\b").expect("italic regex is invalid"));

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inline code spans first, emphasis on everything outside them.
pub fn format_inline(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;

    while let Some(start) = rest.find('`') {
        let after = &rest[start + 1..];
        match after.find('`') {
            Some(end) if end > 0 => {
                out.push_str(&emphasis(&rest[..start]));
                out.push_str("<code>");
                out.push_str(&after[..end]);
                out.push_str("</code>");
                rest = &after[end + 1..];
            }
            _ => break,
        }
    }

    out.push_str(&emphasis(rest));
    out
}

fn emphasis(text: &str) -> String {
    let text = BOLD_STARS.replace_all(text, "<strong>$1</strong>");
    let text = BOLD_UNDERSCORES.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC_STAR.replace_all(&text, "<em>$1</em>");
    ITALIC_UNDERSCORE.replace_all(&text, "<em>$1</em>").into_owned()
}
