// src/ingest/adapters/general.rs
//! Standard syndication feeds: news sites and official blogs.

use crate::ingest::text::{normalize_text, truncate_chars};
use crate::ingest::types::{AdapterMeta, NormalizedArticle, RawEntry};
use crate::sources::SourceDescriptor;

pub const MAX_BODY_CHARS: usize = 2_000;

/// No adapter-level gate here; the scorer decides.
pub fn normalize(entry: RawEntry, source: &SourceDescriptor) -> NormalizedArticle {
    let title = normalize_text(&entry.title);
    let body = truncate_chars(&normalize_text(&entry.body), MAX_BODY_CHARS);
    NormalizedArticle::from_source(
        source,
        title,
        body,
        entry.link,
        entry.published_at,
        AdapterMeta::General,
    )
}
