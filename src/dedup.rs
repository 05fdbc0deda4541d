// src/dedup.rs
//! Cross-source deduplication.
//!
//! Two checks, applied in batch order:
//! - exact: same link key (canonical link, or normalized title when the
//!   article has no link)
//! - near: title token-set Jaccard similarity >= `threshold` against any
//!   article already kept
//!
//! First occurrence wins, so the output keeps input order.

use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use url::Url;

use crate::ingest::types::NormalizedArticle;

pub const DEFAULT_NEAR_DUPLICATE_THRESHOLD: f32 = 0.8;

/// Query parameters that only carry campaign/referrer tracking.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "yclid", "igshid", "mc_cid", "mc_eid", "ref",
    "ref_src", "_hsenc", "_hsmi", "spm",
];

/// What the deduplicator needs to know about an item.
pub trait Dedupable {
    fn link(&self) -> Option<&str>;
    fn title(&self) -> &str;

    fn dedup_key(&self) -> String {
        match self.link().filter(|l| !l.trim().is_empty()) {
            Some(l) => link_key(l),
            None => title_key(self.title()),
        }
    }
}

impl Dedupable for NormalizedArticle {
    fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }
    fn title(&self) -> &str {
        &self.title
    }
}

fn is_tracking_param(name: &str) -> bool {
    let n = name.to_ascii_lowercase();
    n.starts_with("utm_") || TRACKING_PARAMS.contains(&n.as_str())
}

/// Canonical form of a link: lowercase scheme/host, no fragment, no
/// tracking parameters, remaining parameters sorted, no trailing slash.
/// Unparseable links fall back to their trimmed, lowercased text.
pub fn link_key(link: &str) -> String {
    let Ok(url) = Url::parse(link.trim()) else {
        return link.trim().to_lowercase();
    };

    let mut key = format!("{}://", url.scheme());
    if let Some(host) = url.host_str() {
        key.push_str(&host.to_ascii_lowercase());
    }
    if let Some(port) = url.port() {
        key.push_str(&format!(":{port}"));
    }
    key.push_str(url.path().trim_end_matches('/'));

    let params: BTreeSet<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !params.is_empty() {
        let q: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        key.push('?');
        key.push_str(&q.join("&"));
    }
    key
}

/// Lowercased, whitespace-collapsed title.
pub fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercased words with leading/trailing punctuation removed.
pub fn title_tokens(title: &str) -> HashSet<String> {
    title
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// |A ∩ B| / |A ∪ B|; two empty sets score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Short anonymized id for logs: first 6 bytes of SHA-256, hex.
pub fn article_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub input: usize,
    pub exact_removed: usize,
    pub near_removed: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduplicator {
    threshold: f32,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_NEAR_DUPLICATE_THRESHOLD)
    }
}

impl Deduplicator {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn dedupe<T: Dedupable>(&self, items: Vec<T>) -> Vec<T> {
        self.dedupe_with_stats(items).0
    }

    pub fn dedupe_with_stats<T: Dedupable>(&self, items: Vec<T>) -> (Vec<T>, DedupStats) {
        let mut stats = DedupStats {
            input: items.len(),
            ..Default::default()
        };
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut kept_tokens: Vec<HashSet<String>> = Vec::new();
        let mut kept = Vec::with_capacity(items.len());

        for item in items {
            let key = item.dedup_key();
            if seen_keys.contains(&key) {
                stats.exact_removed += 1;
                tracing::debug!(target: "pipeline", id = %article_id(&key), "exact duplicate dropped");
                continue;
            }
            let tokens = title_tokens(item.title());
            if kept_tokens.iter().any(|t| jaccard(t, &tokens) >= self.threshold) {
                stats.near_removed += 1;
                tracing::debug!(target: "pipeline", id = %article_id(&key), "near duplicate dropped");
                continue;
            }
            seen_keys.insert(key);
            kept_tokens.push(tokens);
            kept.push(item);
        }

        stats.kept = kept.len();
        counter!("dedup_removed_total", "kind" => "exact").increment(stats.exact_removed as u64);
        counter!("dedup_removed_total", "kind" => "near").increment(stats.near_removed as u64);
        (kept, stats)
    }
}
