// src/ingest/adapters/mod.rs
//! Per-category fetch adapters.
//!
//! Every adapter shares one retrieval + parse step and differs only in how an
//! entry is cleaned, which metadata is extracted and which quality gate
//! applies. Dispatch is an exhaustive `match` on `SourceCategory`.

pub mod discussion;
pub mod general;
pub mod release;

use chrono::Utc;
use metrics::{counter, histogram};

use crate::dedup::{article_id, link_key, title_key};
use crate::ingest::feed::parse_feed;
use crate::ingest::transport::FeedTransport;
use crate::ingest::types::{FetchError, NormalizedArticle, RawEntry, Rejection};
use crate::sources::{SourceCategory, SourceDescriptor};

/// Knobs the adapters need from the pipeline configuration.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub max_items: usize,
    /// Repositories whose prereleases are still worth reporting.
    pub release_allowlist: Vec<String>,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            max_items: 20,
            release_allowlist: crate::config::default_release_allowlist(),
        }
    }
}

/// Result of one adapter invocation. `articles` is empty whenever `error`
/// is set; partial results are never returned alongside a failure.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub articles: Vec<NormalizedArticle>,
    /// Entries dropped for missing required fields.
    pub skipped: usize,
    /// Entries dropped by the adapter quality gate.
    pub rejected: usize,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn failed(error: FetchError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Clean one entry into an article, or say why the gate dropped it.
pub fn normalize_entry(
    entry: RawEntry,
    source: &SourceDescriptor,
    settings: &AdapterSettings,
) -> Result<NormalizedArticle, Rejection> {
    match source.category {
        SourceCategory::GeneralFeed => Ok(general::normalize(entry, source)),
        SourceCategory::Discussion => discussion::normalize(entry, source),
        SourceCategory::Release => release::normalize(entry, source, settings),
    }
}

/// Turn an already-retrieved document into articles for `source`.
pub fn adapt_document(
    doc: &str,
    source: &SourceDescriptor,
    settings: &AdapterSettings,
) -> FetchOutcome {
    let parsed = match parse_feed(doc, settings.max_items, Utc::now()) {
        Ok(p) => p,
        Err(e) => return FetchOutcome::failed(e),
    };

    let mut out = FetchOutcome {
        skipped: parsed.skipped,
        ..Default::default()
    };
    if out.skipped > 0 {
        tracing::debug!(target: "ingest", source = %source.name, skipped = out.skipped, "untitled entries skipped");
    }
    for entry in parsed.entries {
        let id = article_id(&match entry.link.as_deref() {
            Some(l) => link_key(l),
            None => title_key(&entry.title),
        });
        match normalize_entry(entry, source, settings) {
            Ok(article) => out.articles.push(article),
            Err(reason) => {
                out.rejected += 1;
                tracing::debug!(
                    target: "ingest",
                    source = %source.name,
                    %id,
                    reason = reason.as_str(),
                    "entry rejected by quality gate"
                );
            }
        }
    }

    counter!("ingest_entries_total").increment(out.articles.len() as u64);
    counter!("ingest_skipped_total").increment(out.skipped as u64);
    counter!("ingest_rejected_total").increment(out.rejected as u64);
    out
}

/// Retrieve and adapt one source. Never fails: retrieval and parse errors
/// come back in `FetchOutcome::error` with no articles.
pub async fn fetch(
    transport: &dyn FeedTransport,
    source: &SourceDescriptor,
    settings: &AdapterSettings,
) -> FetchOutcome {
    let t0 = std::time::Instant::now();
    let outcome = match transport.get(&source.endpoint).await {
        Ok(doc) => adapt_document(&doc, source, settings),
        Err(e) => FetchOutcome::failed(e),
    };
    histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    if let Some(e) = &outcome.error {
        tracing::warn!(target: "ingest", source = %source.name, error = %e, "source fetch failed");
        counter!("ingest_source_errors_total").increment(1);
    } else {
        tracing::debug!(
            target: "ingest",
            source = %source.name,
            kept = outcome.articles.len(),
            skipped = outcome.skipped,
            rejected = outcome.rejected,
            "source adapted"
        );
    }
    outcome
}

/// Host of a URL, lowercased, without a leading `www.`.
pub(crate) fn host_of(link: &str) -> Option<String> {
    let u = url::Url::parse(link).ok()?;
    let h = u.host_str()?.to_ascii_lowercase();
    Some(h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
}
