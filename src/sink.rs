// src/sink.rs
//! Persistence boundary. The pipeline hands one deduplicated batch per run
//! to an `ArticleSink`, which drops records it already knows (by dedup key)
//! and reports how many were newly stored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::dedup::{article_id, Dedupable};
use crate::ingest::types::NormalizedArticle;
use crate::relevance::ScoreResult;

/// An accepted article with its score, as handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    /// Short anonymized id of `key`.
    pub id: String,
    /// Canonical link, or normalized title for link-less articles.
    pub key: String,
    #[serde(flatten)]
    pub article: NormalizedArticle,
    pub score: ScoreResult,
}

impl ScoredArticle {
    pub fn new(article: NormalizedArticle, score: ScoreResult) -> Self {
        let key = article.dedup_key();
        Self {
            id: article_id(&key),
            key,
            article,
            score,
        }
    }
}

impl Dedupable for ScoredArticle {
    fn link(&self) -> Option<&str> {
        self.article.link.as_deref()
    }
    fn title(&self) -> &str {
        &self.article.title
    }
    fn dedup_key(&self) -> String {
        self.key.clone()
    }
}

#[async_trait::async_trait]
pub trait ArticleSink: Send + Sync {
    /// Store the batch; returns how many records were new. A failure means
    /// nothing from this batch counts as stored.
    async fn store(&self, batch: Vec<ScoredArticle>) -> Result<usize>;
}

/// In-process sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    keys: HashSet<String>,
    records: Vec<ScoredArticle>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<ScoredArticle> {
        self.inner.lock().await.records.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }
}

#[async_trait::async_trait]
impl ArticleSink for MemorySink {
    async fn store(&self, batch: Vec<ScoredArticle>) -> Result<usize> {
        let mut st = self.inner.lock().await;
        let mut added = 0;
        for rec in batch {
            if st.keys.insert(rec.key.clone()) {
                st.records.push(rec);
                added += 1;
            }
        }
        Ok(added)
    }
}

/// Append-only JSON Lines file. Known keys are loaded on open so re-runs
/// against the same file stay idempotent.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    keys: Mutex<HashSet<String>>,
}

#[derive(Deserialize)]
struct KeyOnly {
    key: String,
}

impl JsonlSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut keys = HashSet::new();
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => {
                // Every append ends in '\n'; anything after the last one was
                // cut short by an interrupted write.
                let (complete, tail) = match s.rfind('\n') {
                    Some(i) => s.split_at(i + 1),
                    None => ("", s.as_str()),
                };
                for (i, line) in complete.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
                    let rec: KeyOnly = serde_json::from_str(line)
                        .with_context(|| format!("{}:{}: bad record", path.display(), i + 1))?;
                    keys.insert(rec.key);
                }
                if !tail.trim().is_empty() {
                    repair_tail(&path, complete, tail, &mut keys).await?;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        }
        tracing::info!(target: "sink", path = %path.display(), known = keys.len(), "jsonl sink opened");
        Ok(Self {
            path,
            keys: Mutex::new(keys),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Terminate an unterminated last line, or cut it off when it does not parse.
async fn repair_tail(
    path: &Path,
    complete: &str,
    tail: &str,
    keys: &mut HashSet<String>,
) -> Result<()> {
    match serde_json::from_str::<KeyOnly>(tail) {
        Ok(rec) => {
            keys.insert(rec.key);
            let mut f = tokio::fs::OpenOptions::new()
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            f.write_all(b"\n").await?;
            f.flush().await?;
        }
        Err(e) => {
            tracing::warn!(
                target: "sink",
                path = %path.display(),
                bytes = tail.len(),
                error = %e,
                "dropping torn trailing record"
            );
            let f = tokio::fs::OpenOptions::new()
                .write(true)
                .open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            f.set_len(complete.len() as u64)
                .await
                .with_context(|| format!("truncating {}", path.display()))?;
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ArticleSink for JsonlSink {
    async fn store(&self, batch: Vec<ScoredArticle>) -> Result<usize> {
        let mut keys = self.keys.lock().await;

        let mut buf = String::new();
        let mut fresh = Vec::new();
        for rec in &batch {
            if keys.contains(&rec.key) || fresh.contains(&rec.key) {
                continue;
            }
            buf.push_str(&serde_json::to_string(rec).context("serializing record")?);
            buf.push('\n');
            fresh.push(rec.key.clone());
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        f.write_all(buf.as_bytes())
            .await
            .with_context(|| format!("appending to {}", self.path.display()))?;
        f.flush().await?;

        let added = fresh.len();
        keys.extend(fresh);
        tracing::debug!(target: "sink", added, "records appended");
        Ok(added)
    }
}
