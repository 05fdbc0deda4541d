// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::pipeline::Pipeline;

/// Run the pipeline on a fixed interval. The first run starts immediately;
/// a slow run delays the next tick instead of overlapping with it.
pub fn spawn_scheduler(
    pipeline: Arc<Pipeline>,
    interval: Duration,
    targets: Vec<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = pipeline.run(Some(targets.as_slice())).await;
            tracing::info!(
                target: "pipeline",
                stored = report.newly_stored,
                failed_sources = report.failed_sources().count(),
                "scheduled run tick"
            );
        }
    })
}
