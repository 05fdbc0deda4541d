// tests/pipeline_run.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use feed_sieve::sources::RegistryError;
use feed_sieve::{
    ArticleSink, FixtureTransport, MemorySink, Pipeline, PipelineConfig, ScoredArticle,
    SourceCategory, SourceDescriptor, SourceRegistry, TrustTier,
};

const GENERAL_URL: &str = "https://news.example.test/feed";
const REDDIT_URL: &str = "https://www.reddit.com/r/MachineLearning/.rss";
const RELEASES_URL: &str = "https://github.com/openai/openai-python/releases.atom";
const HN_URL: &str = "https://hnrss.org/newest?q=AI";

fn registry() -> SourceRegistry {
    SourceRegistry::new(vec![
        SourceDescriptor::new("AI News Daily", GENERAL_URL, SourceCategory::GeneralFeed, TrustTier::High),
        SourceDescriptor::new(
            "Reddit MachineLearning",
            REDDIT_URL,
            SourceCategory::Discussion,
            TrustTier::Community,
        ),
        SourceDescriptor::new("OpenAI Python SDK", RELEASES_URL, SourceCategory::Release, TrustTier::High)
            .organization("OpenAI"),
        SourceDescriptor::new("Hacker News AI", HN_URL, SourceCategory::Discussion, TrustTier::Medium),
    ])
    .expect("valid registry")
}

fn fixtures() -> FixtureTransport {
    FixtureTransport::new()
        .with(GENERAL_URL, include_str!("fixtures/general_rss.xml"))
        .with(REDDIT_URL, include_str!("fixtures/reddit_atom.xml"))
        .with(RELEASES_URL, include_str!("fixtures/github_releases.xml"))
        .with(HN_URL, include_str!("fixtures/hn_rss.xml"))
}

fn pipeline(transport: FixtureTransport, sink: Arc<dyn ArticleSink>) -> Pipeline {
    Pipeline::new(registry(), Arc::new(transport), sink, PipelineConfig::default())
}

#[tokio::test]
async fn full_run_scores_merges_and_dedupes() {
    let sink = Arc::new(MemorySink::new());
    let p = pipeline(fixtures(), sink.clone());

    let report = p.run(None).await;

    let per_source: Vec<(usize, usize, usize)> = report
        .sources
        .iter()
        .map(|s| (s.fetched, s.rejected, s.included))
        .collect();
    assert_eq!(per_source, vec![(4, 0, 2), (2, 2, 2), (2, 1, 2), (3, 0, 2)]);
    assert_eq!(report.sources[0].skipped, 1);
    assert_eq!(report.failed_sources().count(), 0);

    assert_eq!(report.candidates, 8);
    assert_eq!(report.dedup.exact_removed, 1);
    assert_eq!(report.dedup.near_removed, 1);
    assert_eq!(report.newly_stored, 6);
    assert!(report.sink_error.is_none());

    let stored = sink.records().await;
    assert_eq!(stored.len(), 6);
    // Catalog order wins: the general feed's copy of the GPT-5 story is kept.
    assert_eq!(stored[0].article.source, "AI News Daily");
    assert!(stored
        .iter()
        .all(|r| r.article.source != "Hacker News AI"));
}

#[tokio::test]
async fn second_run_stores_nothing_new() {
    let sink = Arc::new(MemorySink::new());
    let p = pipeline(fixtures(), sink.clone());

    assert_eq!(p.run(None).await.newly_stored, 6);
    assert_eq!(p.run(None).await.newly_stored, 0);
    assert_eq!(sink.len().await, 6);
}

#[tokio::test]
async fn missing_and_broken_sources_do_not_abort_the_run() {
    let transport = FixtureTransport::new()
        .with(GENERAL_URL, "this is not xml at all")
        .with(RELEASES_URL, include_str!("fixtures/github_releases.xml"));
    let sink = Arc::new(MemorySink::new());
    let p = pipeline(transport, sink.clone());

    let report = p.run(None).await;
    let failed: Vec<&str> = report.failed_sources().map(|s| s.name.as_str()).collect();
    assert_eq!(failed, vec!["AI News Daily", "Reddit MachineLearning", "Hacker News AI"]);
    assert!(report.sources[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("404")));
    assert_eq!(report.sources[2].included, 2);
    assert_eq!(report.newly_stored, 2);
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out_and_yields_nothing() {
    let transport = fixtures().with_delay(REDDIT_URL, Duration::from_secs(120));
    let sink = Arc::new(MemorySink::new());
    let p = pipeline(transport, sink.clone());

    let report = p.run(None).await;
    let reddit = &report.sources[1];
    assert_eq!(reddit.fetched, 0);
    assert!(reddit.error.as_deref().is_some_and(|e| e.contains("timed out")));
    assert_eq!(report.newly_stored, 4);
}

struct BrokenSink;

#[async_trait]
impl ArticleSink for BrokenSink {
    async fn store(&self, _batch: Vec<ScoredArticle>) -> Result<usize> {
        bail!("disk full")
    }
}

#[tokio::test]
async fn sink_failure_is_reported_not_raised() {
    let p = pipeline(fixtures(), Arc::new(BrokenSink));
    let report = p.run(None).await;
    assert_eq!(report.newly_stored, 0);
    assert_eq!(report.dedup.kept, 6);
    assert!(report.sink_error.as_deref().is_some_and(|e| e.contains("disk full")));
}

#[tokio::test]
async fn target_industries_shape_the_scores() {
    let sink = Arc::new(MemorySink::new());
    let p = pipeline(fixtures(), sink.clone());
    let targets = vec!["healthcare".to_string()];

    p.run(Some(targets.as_slice())).await;
    let stored = sink.records().await;
    assert!(stored
        .iter()
        .all(|r| r.score.industries.keys().all(|k| k == "healthcare")));
}

#[tokio::test]
async fn probe_reports_one_source_and_stores_nothing() {
    let sink = Arc::new(MemorySink::new());
    let p = pipeline(fixtures(), sink.clone());

    let probe = p.probe_source("OpenAI Python SDK", 5).await.expect("known source");
    assert_eq!(probe.fetched, 2);
    assert_eq!(probe.included, 2);
    assert_eq!(probe.samples, vec!["Release v1.40.0", "Release v2.0.0-beta.1"]);
    assert!(probe.error.is_none());
    assert_eq!(sink.len().await, 0);

    let err = p.probe_source("Nope Daily", 5).await.unwrap_err();
    assert_eq!(err, RegistryError::NotFound("Nope Daily".into()));
}

#[tokio::test]
async fn statistics_include_catalog_and_config() {
    let p = pipeline(fixtures(), Arc::new(MemorySink::new()));
    let st = p.statistics();
    assert_eq!(st.sources.total, 4);
    assert_eq!(st.sources.by_category.get("discussion"), Some(&2));
    assert_eq!(st.config.min_score, 0.3);

    let json = serde_json::to_value(&st).expect("serializable");
    assert_eq!(json["config"]["near_duplicate_threshold"], serde_json::json!(0.8f32));
}
