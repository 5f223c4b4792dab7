//! Aggregation pipeline - orchestration of one aggregation-and-replace run
//!
//! ## Architecture
//!
//! ```text
//! SourceSession (read-only)          DestinationStore
//!     │                                   │
//!     │                              begin (IMMEDIATE)
//!     ▼                                   ▼
//! for unit in units:
//!     read(unit) ──── Vec<ResultRow> ───► replace(unit, rows)
//!                                         │
//!                                      commit ──► all tables swap at once
//! ```
//!
//! Any error drops the destination transaction (rollback of every unit) and
//! ends the run. There is no retry.
//!
//! Only one run per `AggregationPipeline` executes at a time; an overlapping
//! call fails with [`PipelineError::AlreadyRunning`] without opening either
//! store.

use super::config::{redact_url, PipelineConfig};
use super::db::DestinationStore;
use super::error::PipelineError;
use super::source::SourceSession;
use super::types::{AggregationUnit, RunResult, RunSummary, UnitSummary};
use super::units::sales_units;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Runs a fixed, ordered list of aggregation units from source to destination
pub struct AggregationPipeline {
    config: PipelineConfig,
    units: Vec<AggregationUnit>,
    running: AtomicBool,
}

impl AggregationPipeline {
    /// Pipeline over the built-in sales units
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_units(config, sales_units())
    }

    /// Pipeline over a custom unit list (executed in the given order)
    pub fn with_units(config: PipelineConfig, units: Vec<AggregationUnit>) -> Self {
        Self {
            config,
            units,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn units(&self) -> &[AggregationUnit] {
        &self.units
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Execute one run and reduce it to the trigger contract
    pub fn run(&self) -> RunResult {
        match self.execute() {
            Ok(summary) => {
                log::info!(
                    "✅ Aggregation run completed: {} units, {} rows in {}ms",
                    summary.units.len(),
                    summary.total_rows(),
                    summary.duration_ms
                );
                match serde_json::to_string(&summary) {
                    Ok(json) => log::debug!("📊 Run summary: {}", json),
                    Err(e) => log::debug!("⚠️  Run summary not serializable: {}", e),
                }
                RunResult::Success
            }
            Err(e) => {
                log::error!("❌ Aggregation run failed: {}", e);
                RunResult::Failure(e.to_string())
            }
        }
    }

    /// Execute one run
    ///
    /// Steps:
    /// 1. Claim the single-flight gate
    /// 2. Open the source session and the destination transaction
    /// 3. For each unit in order: read from source, replace in destination
    /// 4. Commit the destination transaction
    ///
    /// # Errors
    /// Returns the first error hit; the destination is left untouched.
    pub fn execute(&self) -> Result<RunSummary, PipelineError> {
        let _gate = RunGate::acquire(&self.running)?;

        let started_at = chrono::Utc::now();
        let start = Instant::now();

        log::info!(
            "🚀 Aggregation run started: {} → {} ({} units, source isolation: {})",
            redact_url(&self.config.source_url),
            redact_url(&self.config.destination_url),
            self.units.len(),
            self.config.source_isolation.as_str()
        );

        let source = SourceSession::open(
            &self.config.source_url,
            self.config.source_isolation,
            self.config.busy_timeout,
        )?;
        let mut destination =
            DestinationStore::open(&self.config.destination_url, self.config.busy_timeout)?;
        let tx = destination.begin()?;

        let mut units = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let rows = source.read(unit)?;
            let rows_written = tx.replace(unit, &rows)?;

            log::info!("   ├─ {} → {} ({} rows)", unit.name, unit.destination_table, rows_written);

            units.push(UnitSummary {
                name: unit.name.clone(),
                destination_table: unit.destination_table.clone(),
                rows_written,
            });
        }

        source.close()?;
        tx.commit()?;

        Ok(RunSummary {
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            units,
        })
    }
}

/// Holds the single-flight flag for the duration of a run
struct RunGate<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGate<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PipelineError> {
        if flag.swap(true, Ordering::AcqRel) {
            log::warn!("⚠️  Aggregation run requested while another is in progress");
            return Err(PipelineError::AlreadyRunning);
        }
        Ok(Self { flag })
    }
}

impl Drop for RunGate<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
