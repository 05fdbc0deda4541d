//! feed-sieve: binary entrypoint.
//!
//! `feed-sieve`               one run (or periodic runs with INGEST_INTERVAL_SECS)
//! `feed-sieve probe <name>`  fetch + score a single source, store nothing
//! `feed-sieve stats`         print catalog statistics and effective config

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_sieve::{JsonlSink, Pipeline, PipelineConfig, SourceRegistry};

const DEFAULT_OUTPUT_PATH: &str = "data/articles.jsonl";
const DEFAULT_LOG_FILTER: &str = "feed_sieve=info,warn";
const PROBE_MAX_ITEMS: usize = 5;

/// RUST_LOG wins; LOG_FORMAT=json switches to structured output.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(v) => {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a number of seconds"))?;
            if secs == 0 {
                bail!("{name} must be positive");
            }
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local runs; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr.parse().context("METRICS_ADDR must be host:port")?;
        feed_sieve::metrics::install_exporter(addr)?;
    }

    let config = PipelineConfig::load_default()?;
    let registry = SourceRegistry::load_default()?;

    let output = std::env::var("OUTPUT_PATH").unwrap_or_else(|_| DEFAULT_OUTPUT_PATH.to_string());
    if let Some(dir) = std::path::Path::new(&output).parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
    }
    let sink = Arc::new(JsonlSink::open(&output).await?);
    let pipeline = Arc::new(Pipeline::with_http(registry, sink, config)?);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("stats") => {
            println!("{}", serde_json::to_string_pretty(&pipeline.statistics())?);
        }
        Some("probe") => {
            let Some(name) = args.get(1) else {
                bail!("usage: feed-sieve probe <source name>");
            };
            let report = pipeline.probe_source(name, PROBE_MAX_ITEMS).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(other) => bail!("unknown command `{other}` (expected `stats` or `probe`)"),
        None => {
            let targets = pipeline.config().target_industries.clone();
            if let Some(every) = env_secs("INGEST_INTERVAL_SECS")? {
                tracing::info!(interval = ?every, "starting scheduled runs");
                feed_sieve::scheduler::spawn_scheduler(Arc::clone(&pipeline), every, targets)
                    .await
                    .context("scheduler task ended")?;
            } else {
                let report = pipeline.run(Some(targets.as_slice())).await;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }
    Ok(())
}
