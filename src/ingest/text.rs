// src/ingest/text.rs
//! Markup stripping and length bounding shared by all adapters.

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_block() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<\s*(?:br|hr|p|li|/p|/div|/li|/ul|/ol|/h[1-6]|/tr|/pre|/blockquote)\b[^>]*>")
            .unwrap()
    })
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<!--.*?-->|</?[a-z!][^>]*>").unwrap())
}

fn re_inline_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[^\S\n]+").unwrap())
}

fn strip_markup(s: &str) -> String {
    // Block boundaries become line breaks so line-oriented extractors still work.
    let out = re_block().replace_all(s, "\n");
    let out = re_tags().replace_all(&out, "");
    let out = html_escape::decode_html_entities(&out).to_string();
    out.replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\r', "\n")
}

/// Single-line plain text: markup stripped, entities decoded, typographic
/// quotes folded to ASCII, whitespace collapsed.
pub fn normalize_text(s: &str) -> String {
    strip_markup(s).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text lines of a markup fragment, each trimmed and internally
/// whitespace-collapsed. Empty lines are dropped.
pub fn markup_to_lines(s: &str) -> Vec<String> {
    strip_markup(s)
        .lines()
        .map(|l| re_inline_ws().replace_all(l.trim(), " ").to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Cap to `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
