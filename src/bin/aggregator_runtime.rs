//! Aggregator Runtime - periodic sales aggregation
//!
//! This binary:
//! - Loads `PipelineConfig` from the environment
//! - Triggers an aggregation run every `AGGREGATION_INTERVAL_SECS`
//! - Stops on CTRL+C (an in-flight run completes or fails on its own)
//!
//! Usage:
//!   cargo run --release --bin aggregator_runtime
//!
//! Environment variables:
//!   SOURCE_DATABASE_URL - operational store (fallback: DATABASE_URL)
//!   DESTINATION_DATABASE_URL - analytical store
//!   SOURCE_ISOLATION - per_query | snapshot (default: per_query)
//!   DB_BUSY_TIMEOUT_MS - lock wait (default: 5000, max: 2147483647)
//!   AGGREGATION_INTERVAL_SECS - period, 0 = single run (default: 3600)

use dotenv::dotenv;
use log::{error, info};
use salesflow::pipeline::{
    config::redact_url, run_scheduler, trigger, AggregationPipeline, PipelineConfig, RunResult,
    RunTrigger,
};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Aggregator Runtime");

    let pipeline = Arc::new(AggregationPipeline::new(PipelineConfig::from_env()?));
    let config = pipeline.config();

    info!("📊 Configuration:");
    info!("   ├─ Source: {}", redact_url(&config.source_url));
    info!("   ├─ Destination: {}", redact_url(&config.destination_url));
    info!("   ├─ Source isolation: {}", config.source_isolation.as_str());
    info!("   ├─ Busy timeout: {}ms", config.busy_timeout.as_millis());
    info!("   ├─ Interval: {}s", config.interval_secs);
    info!("   └─ Units:");
    for unit in pipeline.units() {
        info!("      • {} → {}", unit.name, unit.destination_table);
    }

    let interval_secs = config.interval_secs;

    if interval_secs == 0 {
        info!("⚠️  AGGREGATION_INTERVAL_SECS=0, running once");
        return match trigger(pipeline).await {
            RunResult::Success => Ok(()),
            RunResult::Failure(cause) => Err(cause.into()),
        };
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run_trigger: Arc<dyn RunTrigger> = Arc::new(pipeline);
    let scheduler = tokio::spawn(run_scheduler(run_trigger, interval_secs, shutdown_rx));

    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
        Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
    }

    shutdown_tx.send(true).ok();
    let runs = scheduler.await?;

    info!("✅ Aggregator runtime stopped ({} runs)", runs);
    Ok(())
}
