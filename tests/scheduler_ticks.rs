// tests/scheduler_ticks.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use feed_sieve::scheduler::spawn_scheduler;
use feed_sieve::{
    ArticleSink, FixtureTransport, MemorySink, Pipeline, PipelineConfig, ScoredArticle,
    SourceCategory, SourceDescriptor, SourceRegistry, TrustTier,
};

const URL: &str = "https://github.com/openai/openai-python/releases.atom";

/// Memory sink that also counts how many runs reached it.
#[derive(Default)]
struct CountingSink {
    calls: AtomicUsize,
    inner: MemorySink,
}

#[async_trait::async_trait]
impl ArticleSink for CountingSink {
    async fn store(&self, batch: Vec<ScoredArticle>) -> anyhow::Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.store(batch).await
    }
}

#[tokio::test(start_paused = true)]
async fn scheduler_runs_immediately_then_on_each_tick() {
    let registry = SourceRegistry::new(vec![SourceDescriptor::new(
        "OpenAI Python SDK",
        URL,
        SourceCategory::Release,
        TrustTier::High,
    )])
    .unwrap();
    let transport = FixtureTransport::new().with(URL, include_str!("fixtures/github_releases.xml"));
    let sink = Arc::new(CountingSink::default());
    let pipeline = Arc::new(Pipeline::new(
        registry,
        Arc::new(transport),
        sink.clone(),
        PipelineConfig::default(),
    ));

    let handle = spawn_scheduler(pipeline, Duration::from_secs(600), Vec::new());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.inner.len().await, 2);

    // Ticks at 600s and 1200s each run again; the documents are unchanged,
    // so nothing new is stored.
    tokio::time::sleep(Duration::from_secs(1_300)).await;
    assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    assert_eq!(sink.inner.len().await, 2);
    assert!(!handle.is_finished());

    handle.abort();
}
