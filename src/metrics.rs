// src/metrics.rs
//! Metric descriptions and the optional Prometheus exporter.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up with help text).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Entries normalized by adapters.");
        describe_counter!(
            "ingest_skipped_total",
            "Feed entries skipped for missing required fields."
        );
        describe_counter!(
            "ingest_rejected_total",
            "Entries dropped by an adapter quality gate."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Sources whose fetch or parse failed."
        );
        describe_histogram!(
            "ingest_fetch_ms",
            Unit::Milliseconds,
            "Per-source fetch + adapt time."
        );
        describe_histogram!("ingest_parse_ms", Unit::Milliseconds, "Feed document parse time.");
        describe_counter!("relevance_included_total", "Articles passing the inclusion decision.");
        describe_counter!("relevance_excluded_total", "Articles failing the inclusion decision.");
        describe_counter!("dedup_removed_total", "Articles removed as duplicates, by kind.");
        describe_counter!("pipeline_stored_total", "Articles newly stored by the sink.");
        describe_counter!("pipeline_runs_total", "Completed pipeline runs.");
        describe_counter!("pipeline_sink_errors_total", "Runs whose sink call failed.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last finished.");
    });
}

/// Install the Prometheus recorder with its own scrape listener.
/// Must be called inside a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("installing prometheus exporter")?;
    describe();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
