// src/lib.rs
//! Batch collector for AI business news: fetches syndication, discussion and
//! release feeds, scores each item for AI and industry relevance, removes
//! cross-source duplicates and hands the survivors to a sink.

pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod relevance;
pub mod scheduler;
pub mod sink;
pub mod sources;

// ---- Re-exports for a stable public API ----
pub use config::PipelineConfig;
pub use dedup::Deduplicator;
pub use ingest::{FeedTransport, FixtureTransport, HttpTransport, NormalizedArticle};
pub use pipeline::{Pipeline, ProbeReport, RunReport, SourceStats};
pub use relevance::{RelevanceScorer, RelevanceTier, ScoreResult};
pub use sink::{ArticleSink, JsonlSink, MemorySink, ScoredArticle};
pub use sources::{SourceCategory, SourceDescriptor, SourceRegistry, TrustTier};
