// src/ingest/adapters/discussion.rs
//! Community discussion venues (subreddit and Hacker News style feeds).
//!
//! Venue chrome ("submitted by", "[link] [comments]") is stripped from the
//! body after the comment count and author have been read out of it.

use once_cell::sync::OnceCell;
use regex::Regex;

use super::host_of;
use crate::ingest::text::{markup_to_lines, normalize_text, truncate_chars};
use crate::ingest::types::{
    AdapterMeta, DiscussionMeta, NormalizedArticle, PostType, RawEntry, Rejection, VenueContext,
};
use crate::sources::SourceDescriptor;

pub const MAX_BODY_CHARS: usize = 1_500;

const MIN_TITLE_CHARS: usize = 10;
const MIN_BODY_CHARS: usize = 30;
const MIN_GENERAL_BODY_CHARS: usize = 100;
const MIN_LINE_CHARS: usize = 10;

const CHROME_PHRASES: &[&str] = &[
    "submitted by",
    "comments",
    "share",
    "report",
    "[link]",
    "[comments]",
    "reddit.com",
];

const REMOVAL_MARKERS: &[&str] = &[
    "eli5",
    "explain like",
    "daily thread",
    "weekly thread",
    "deleted",
    "removed",
    "[removed]",
    "[deleted]",
];

/// Hosts that serve the discussion itself rather than an external article.
const DISCUSSION_HOSTS: &[&str] = &["reddit.com", "news.ycombinator.com"];

fn re_tag_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^\[.*?\]\s*").unwrap())
}

fn re_venue_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^r/\w+\s*[-:]\s*").unwrap())
}

fn re_comment_count() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+comments?").unwrap())
}

fn re_submitted_by() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"submitted by.*?/u/([^\s\]]+)").unwrap())
}

fn re_venue_in_link() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"/r/([^/]+)/").unwrap())
}

pub fn normalize(entry: RawEntry, source: &SourceDescriptor) -> Result<NormalizedArticle, Rejection> {
    let title = clean_title(&entry.title);

    // Read metadata out of the chrome before it is stripped.
    let flat = normalize_text(&entry.body);
    let comment_count = re_comment_count()
        .captures(&flat.to_lowercase())
        .and_then(|c| c[1].parse::<u32>().ok());
    let author = entry.author.clone().or_else(|| {
        re_submitted_by()
            .captures(&flat)
            .map(|c| format!("u/{}", &c[1]))
    });

    let body = clean_body(&entry.body);
    let venue = extract_venue(&entry.categories, entry.link.as_deref());
    let post_type = classify_post(&title, &body, entry.link.as_deref(), &source.endpoint);

    quality_gate(&title, &body, post_type)?;

    let context = venue_context(venue.as_deref());
    let meta = DiscussionMeta {
        venue,
        author,
        post_type,
        comment_count,
        context,
    };
    Ok(NormalizedArticle::from_source(
        source,
        title,
        body,
        entry.link,
        entry.published_at,
        AdapterMeta::Discussion(meta),
    ))
}

/// Drop leading `[tag]` and `r/venue -` prefixes.
pub fn clean_title(raw: &str) -> String {
    let t = normalize_text(raw);
    let t = re_tag_prefix().replace(&t, "");
    let t = re_venue_prefix().replace(&t, "");
    t.trim().to_string()
}

fn clean_body(raw: &str) -> String {
    let kept: Vec<String> = markup_to_lines(raw)
        .into_iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            !CHROME_PHRASES.iter().any(|p| lower.contains(p))
        })
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect();
    truncate_chars(&kept.join("\n"), MAX_BODY_CHARS)
}

fn extract_venue(categories: &[String], link: Option<&str>) -> Option<String> {
    if let Some(c) = categories.iter().find(|c| c.starts_with("r/")) {
        return Some(c.clone());
    }
    let link = link?;
    re_venue_in_link()
        .captures(link)
        .map(|c| format!("r/{}", &c[1]))
}

fn is_discussion_host(host: &str, endpoint_host: Option<&str>) -> bool {
    DISCUSSION_HOSTS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        || endpoint_host == Some(host)
}

/// Ordered keyword/URL heuristics; first match wins.
pub fn classify_post(title: &str, body: &str, link: Option<&str>, endpoint: &str) -> PostType {
    let t = title.to_lowercase();
    let b = body.to_lowercase();

    if ["?", "how to", "help", "question"].iter().any(|k| t.contains(k)) {
        return PostType::Question;
    }
    if ["discussion", "thoughts", "opinion"].iter().any(|k| t.contains(k)) {
        return PostType::Discussion;
    }
    if ["announced", "released", "launched"].iter().any(|k| b.contains(k)) {
        return PostType::News;
    }
    let endpoint_host = host_of(endpoint);
    if let Some(host) = link.and_then(host_of) {
        if !is_discussion_host(&host, endpoint_host.as_deref()) {
            return PostType::ExternalLink;
        }
    }
    if ["tutorial", "guide"].iter().any(|k| t.contains(k)) {
        return PostType::Tutorial;
    }
    PostType::General
}

pub fn quality_gate(title: &str, body: &str, post_type: PostType) -> Result<(), Rejection> {
    let body_chars = body.chars().count();
    if title.chars().count() < MIN_TITLE_CHARS || body_chars < MIN_BODY_CHARS {
        return Err(Rejection::TooShort);
    }
    if post_type == PostType::Question {
        return Err(Rejection::Question);
    }
    let text = format!("{title} {body}").to_lowercase();
    if REMOVAL_MARKERS.iter().any(|m| text.contains(m)) {
        return Err(Rejection::NoiseMarker);
    }
    match post_type {
        PostType::News | PostType::Discussion | PostType::ExternalLink => Ok(()),
        _ if body_chars > MIN_GENERAL_BODY_CHARS => Ok(()),
        _ => Err(Rejection::ThinContent),
    }
}

/// Static per-venue context; unknown venues get a general default.
pub fn venue_context(venue: Option<&str>) -> VenueContext {
    let (focus, level, industries): (&str, &str, &[&str]) = match venue
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("r/machinelearning") => ("research", "high", &["technology", "research"][..]),
        Some("r/openai") => ("product", "medium", &["technology", "financial"][..]),
        Some("r/localllama") => ("implementation", "high", &["technology", "utilities"][..]),
        Some("r/artificial") => ("general", "low", &["technology"][..]),
        _ => ("general", "medium", &["technology"][..]),
    };
    VenueContext {
        focus: focus.to_string(),
        technical_level: level.to_string(),
        industries: industries.iter().map(|s| s.to_string()).collect(),
    }
}
