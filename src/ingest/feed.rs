// src/ingest/feed.rs
//! RSS 2.0 and Atom document parsing into `RawEntry` values.
//!
//! Only the fields the adapters use are modelled; everything else in the
//! document is ignored. Dates are parsed best-effort (RFC 2822 for RSS,
//! RFC 3339 for Atom) and fall back to the fetch time.

use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{FetchError, RawEntry};

/* ----------------------------
RSS 2.0
---------------------------- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    // Namespaced elements arrive under their local name.
    #[serde(rename = "encoded", alias = "content:encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "creator", alias = "dc:creator")]
    creator: Option<String>,
    author: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<TextNode>,
}

/* ----------------------------
Atom
---------------------------- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    content: Option<TextNode>,
    summary: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
    author: Option<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
    #[serde(rename = "@label")]
    label: Option<String>,
}

/// Element whose text we want regardless of its attributes.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

/// Decide the document family from its root element.
pub fn sniff_format(doc: &str) -> Option<FeedFormat> {
    if doc.contains("<rss") {
        Some(FeedFormat::Rss)
    } else if doc.contains("<feed") {
        Some(FeedFormat::Atom)
    } else {
        None
    }
}

/// Outcome of parsing one document: usable entries plus the number of
/// entries skipped for missing required fields.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub entries: Vec<RawEntry>,
    pub skipped: usize,
}

/// Parse up to `max_items` entries. `now` is the fallback publish time.
pub fn parse_feed(doc: &str, max_items: usize, now: DateTime<Utc>) -> Result<ParsedFeed, FetchError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(doc);

    let parsed = match sniff_format(&xml_clean) {
        Some(FeedFormat::Rss) => {
            let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
            collect(rss.channel.items.into_iter().take(max_items).map(|it| rss_entry(it, now)))
        }
        Some(FeedFormat::Atom) => {
            let feed: AtomFeed =
                from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
            collect(feed.entries.into_iter().take(max_items).map(|e| atom_entry(e, now)))
        }
        None => return Err(FetchError::UnsupportedFormat),
    };

    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(parsed)
}

fn collect(entries: impl Iterator<Item = Option<RawEntry>>) -> ParsedFeed {
    let mut out = ParsedFeed::default();
    for e in entries {
        match e {
            Some(entry) => out.entries.push(entry),
            None => out.skipped += 1,
        }
    }
    out
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn rss_entry(it: Item, now: DateTime<Utc>) -> Option<RawEntry> {
    let title = non_empty(it.title)?;
    let body = non_empty(it.content_encoded)
        .or_else(|| non_empty(it.description))
        .unwrap_or_default();
    Some(RawEntry {
        title,
        body,
        link: non_empty(it.link),
        published_at: it
            .pub_date
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now),
        author: non_empty(it.creator).or_else(|| non_empty(it.author)),
        categories: it
            .categories
            .into_iter()
            .filter_map(|c| non_empty(Some(c.value)))
            .collect(),
    })
}

fn atom_entry(e: AtomEntry, now: DateTime<Utc>) -> Option<RawEntry> {
    let title = non_empty(e.title.map(|t| t.value))?;
    let body = non_empty(e.content.map(|t| t.value))
        .or_else(|| non_empty(e.summary.map(|t| t.value)))
        .unwrap_or_default();

    // Prefer rel="alternate" (or no rel); fall back to the first href.
    let link = e
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| e.links.first())
        .and_then(|l| non_empty(l.href.clone()));

    let published_at = e
        .published
        .as_deref()
        .or(e.updated.as_deref())
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let categories = e
        .categories
        .into_iter()
        .flat_map(|c| [c.term, c.label])
        .filter_map(non_empty)
        .collect();

    Some(RawEntry {
        title,
        body,
        link,
        published_at,
        author: e.author.and_then(|a| non_empty(a.name)),
        categories,
    })
}

/// RFC 2822 first (RSS), then RFC 3339 (Atom). `None` if neither parses.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let odt = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

/// HTML entities are not valid XML outside CDATA; fold the common ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
