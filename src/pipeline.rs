// src/pipeline.rs
//! Run orchestration: fetch every source, score, merge, dedupe, store.
//!
//! Sources are fetched concurrently (bounded by `concurrency`), one task per
//! source, each with its own timeout. Results are merged in catalog order
//! only after every task finished, so dedup always sees the full batch.
//! A run never fails as a whole: source, entry and sink failures are
//! recorded in the `RunReport`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::PipelineConfig;
use crate::dedup::{DedupStats, Deduplicator};
use crate::ingest::adapters::{self, AdapterSettings, FetchOutcome};
use crate::ingest::transport::{FeedTransport, HttpTransport};
use crate::ingest::types::FetchError;
use crate::relevance::RelevanceScorer;
use crate::sink::{ArticleSink, ScoredArticle};
use crate::sources::{RegistryError, SourceCategory, SourceDescriptor, SourceRegistry, SourceStatistics};

/// Per-source outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStats {
    pub name: String,
    pub category: SourceCategory,
    /// Articles the adapter returned (after its quality gate).
    pub fetched: usize,
    pub skipped: usize,
    pub rejected: usize,
    /// Articles passing the inclusion decision.
    pub included: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceStats>,
    /// Included articles across all sources, before dedup.
    pub candidates: usize,
    pub dedup: DedupStats,
    /// What the sink reported as new. Zero when the sink failed.
    pub newly_stored: usize,
    pub sink_error: Option<String>,
}

impl RunReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceStats> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub source: String,
    pub fetched: usize,
    pub included: usize,
    pub samples: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatistics {
    pub sources: SourceStatistics,
    pub config: PipelineConfig,
}

pub struct Pipeline {
    registry: Arc<SourceRegistry>,
    transport: Arc<dyn FeedTransport>,
    sink: Arc<dyn ArticleSink>,
    config: PipelineConfig,
    scorer: RelevanceScorer,
    dedup: Deduplicator,
}

const PROBE_SAMPLES: usize = 3;

impl Pipeline {
    pub fn new(
        registry: SourceRegistry,
        transport: Arc<dyn FeedTransport>,
        sink: Arc<dyn ArticleSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            transport,
            sink,
            scorer: RelevanceScorer::new(config.min_score),
            dedup: Deduplicator::new(config.near_duplicate_threshold),
            config,
        }
    }

    /// Production wiring: HTTP retrieval with the configured timeout and
    /// client identifier.
    pub fn with_http(
        registry: SourceRegistry,
        sink: Arc<dyn ArticleSink>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout(), &config.user_agent)?;
        Ok(Self::new(registry, Arc::new(transport), sink, config))
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn statistics(&self) -> PipelineStatistics {
        PipelineStatistics {
            sources: self.registry.statistics(),
            config: self.config.clone(),
        }
    }

    fn targets<'a>(&'a self, requested: Option<&'a [String]>) -> &'a [String] {
        match requested {
            Some(t) if !t.is_empty() => t,
            _ => self.config.target_industries.as_slice(),
        }
    }

    /// One full pass over the registry. `targets` overrides the configured
    /// target industries for this run.
    pub async fn run(&self, targets: Option<&[String]>) -> RunReport {
        crate::metrics::describe();
        let started_at = Utc::now();
        let targets = self.targets(targets);

        let outcomes = self.fetch_all().await;

        let mut stats = Vec::with_capacity(outcomes.len());
        let mut candidates = Vec::new();
        for (source, outcome) in outcomes {
            let mut st = SourceStats {
                name: source.name.clone(),
                category: source.category,
                fetched: outcome.articles.len(),
                skipped: outcome.skipped,
                rejected: outcome.rejected,
                included: 0,
                error: outcome.error.as_ref().map(|e| e.to_string()),
            };
            for article in outcome.articles {
                let score = self.scorer.score_article(&article, Some(targets));
                let rec = ScoredArticle::new(article, score);
                if self.scorer.should_include(&rec.score) {
                    st.included += 1;
                    candidates.push(rec);
                } else {
                    tracing::debug!(
                        target: "relevance",
                        id = %rec.id,
                        source = %source.name,
                        tier = rec.score.relevance.as_str(),
                        noise = rec.score.noise,
                        overall = rec.score.overall,
                        "article excluded"
                    );
                }
            }
            counter!("relevance_included_total").increment(st.included as u64);
            counter!("relevance_excluded_total").increment((st.fetched - st.included) as u64);
            stats.push(st);
        }

        let candidate_count = candidates.len();
        let (batch, dedup) = self.dedup.dedupe_with_stats(candidates);

        let (newly_stored, sink_error) = match self.sink.store(batch).await {
            Ok(n) => (n, None),
            Err(e) => {
                tracing::warn!(target: "sink", error = %format!("{e:#}"), "sink store failed");
                counter!("pipeline_sink_errors_total").increment(1);
                (0, Some(format!("{e:#}")))
            }
        };

        let finished_at = Utc::now();
        counter!("pipeline_stored_total").increment(newly_stored as u64);
        counter!("pipeline_runs_total").increment(1);
        gauge!("pipeline_last_run_ts").set(finished_at.timestamp() as f64);

        let report = RunReport {
            started_at,
            finished_at,
            sources: stats,
            candidates: candidate_count,
            dedup,
            newly_stored,
            sink_error,
        };
        tracing::info!(
            target: "pipeline",
            sources = report.sources.len(),
            failed = report.failed_sources().count(),
            candidates = report.candidates,
            exact_dupes = report.dedup.exact_removed,
            near_dupes = report.dedup.near_removed,
            stored = report.newly_stored,
            "pipeline run finished"
        );
        report
    }

    /// Fetch every source concurrently; results come back in catalog order.
    async fn fetch_all(&self) -> Vec<(SourceDescriptor, FetchOutcome)> {
        let permits = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let settings = Arc::new(self.config.adapter_settings());
        let timeout = self.config.request_timeout();

        let handles: Vec<_> = self
            .registry
            .list_sources()
            .iter()
            .map(|src| {
                let src = src.clone();
                let permits = Arc::clone(&permits);
                let transport = Arc::clone(&self.transport);
                let settings = Arc::clone(&settings);
                let handle = tokio::spawn({
                    let src = src.clone();
                    async move {
                        let _permit = permits.acquire_owned().await.ok();
                        fetch_bounded(transport.as_ref(), &src, &settings, timeout).await
                    }
                });
                (src, handle)
            })
            .collect();

        let mut out = Vec::with_capacity(handles.len());
        for (src, handle) in handles {
            let outcome = match handle.await {
                Ok(o) => o,
                Err(e) => {
                    tracing::warn!(target: "ingest", source = %src.name, error = %e, "fetch task aborted");
                    FetchOutcome::failed(FetchError::Http(format!("fetch task aborted: {e}")))
                }
            };
            out.push((src, outcome));
        }
        out
    }

    /// Fetch and score a single source without storing anything.
    pub async fn probe_source(&self, name: &str, max_items: usize) -> Result<ProbeReport, RegistryError> {
        let src = self.registry.get(name)?.clone();
        let settings = AdapterSettings {
            max_items: max_items.max(1),
            ..self.config.adapter_settings()
        };
        let outcome = fetch_bounded(
            self.transport.as_ref(),
            &src,
            &settings,
            self.config.request_timeout(),
        )
        .await;

        let targets = self.targets(None);
        let included = outcome
            .articles
            .iter()
            .filter(|a| {
                let s = self.scorer.score_article(a, Some(targets));
                self.scorer.should_include(&s)
            })
            .count();

        Ok(ProbeReport {
            source: src.name,
            fetched: outcome.articles.len(),
            included,
            samples: outcome
                .articles
                .iter()
                .take(PROBE_SAMPLES)
                .map(|a| a.title.clone())
                .collect(),
            error: outcome.error.map(|e| e.to_string()),
        })
    }
}

/// Adapter fetch with a hard deadline; a timed-out source yields nothing.
async fn fetch_bounded(
    transport: &dyn FeedTransport,
    source: &SourceDescriptor,
    settings: &AdapterSettings,
    timeout: Duration,
) -> FetchOutcome {
    match tokio::time::timeout(timeout, adapters::fetch(transport, source, settings)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(target: "ingest", source = %source.name, ?timeout, "source fetch timed out");
            counter!("ingest_source_errors_total").increment(1);
            FetchOutcome::failed(FetchError::Timeout(timeout))
        }
    }
}
