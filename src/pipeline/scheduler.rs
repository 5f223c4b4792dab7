//! Trigger surface and periodic scheduling of pipeline runs
//!
//! The pipeline itself is blocking (rusqlite). Async callers go through
//! [`RunTrigger`], which moves each run onto tokio's blocking pool.

use super::engine::AggregationPipeline;
use super::types::RunResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Anything that can be asked to perform one aggregation run
#[async_trait]
pub trait RunTrigger: Send + Sync {
    /// Perform one run and report its two-valued outcome
    async fn trigger(&self) -> RunResult;
}

#[async_trait]
impl RunTrigger for Arc<AggregationPipeline> {
    async fn trigger(&self) -> RunResult {
        trigger(self.clone()).await
    }
}

/// Run the pipeline once on the blocking pool
pub async fn trigger(pipeline: Arc<AggregationPipeline>) -> RunResult {
    match tokio::task::spawn_blocking(move || pipeline.run()).await {
        Ok(result) => result,
        Err(e) => {
            log::error!("❌ Aggregation task did not complete: {}", e);
            RunResult::Failure(format!("aggregation task did not complete: {}", e))
        }
    }
}

/// Scheduler task - trigger a run every `interval_secs` until shutdown
///
/// The first run starts immediately. A failed run is logged and the next
/// tick proceeds as usual; a run that outlasts the period delays the next
/// tick instead of queueing a burst.
///
/// Arguments:
/// - `trigger`: what to run each period
/// - `interval_secs`: period in seconds (must be > 0)
/// - `shutdown`: flips to `true` to stop the loop
///
/// Returns the number of runs started.
pub async fn run_scheduler(
    trigger: Arc<dyn RunTrigger>,
    interval_secs: u64,
    shutdown: watch::Receiver<bool>,
) -> u64 {
    run_scheduler_every(trigger, Duration::from_secs(interval_secs), shutdown).await
}

async fn run_scheduler_every(
    trigger: Arc<dyn RunTrigger>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    log::info!("⏰ Starting aggregation scheduler (interval: {}s)", period.as_secs());

    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut runs = 0u64;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = timer.tick() => {
                runs += 1;
                match trigger.trigger().await {
                    RunResult::Success => log::debug!("✅ Scheduled run #{} succeeded", runs),
                    RunResult::Failure(cause) => {
                        log::error!("❌ Scheduled run #{} failed: {}", runs, cause)
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    log::info!("⏹️  Aggregation scheduler stopped after {} runs", runs);
    runs
}
