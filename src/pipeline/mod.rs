//! # Sales aggregation pipeline
//!
//! Periodically recomputes sales analytics from the operational store
//! (source) and republishes them into the analytical store (destination).
//!
//! ## Architecture: Aggregate-and-Replace
//!
//! 1. Open a read-only session on the source
//! 2. Open one write transaction on the destination
//! 3. For each aggregation unit, in declared order:
//!    - run its read query against the source
//!    - `DELETE FROM` its destination table
//!    - insert the freshly computed rows
//! 4. Commit, or roll every unit back together
//!
//! A destination table therefore always mirrors the latest successful run:
//! no merges, no stale rows, no partially replaced tables.
//!
//! ## Consistency
//!
//! - Destination: all-or-nothing per run.
//! - Source: by default every unit query sees its own committed state
//!   (`SourceIsolation::PerQuery`); concurrent source writers can make units
//!   disagree. `SourceIsolation::Snapshot` runs every query in one read
//!   transaction instead.
//! - Concurrent runs: one run per pipeline instance (single-flight gate);
//!   runs from other processes queue on the destination write lock.
//!
//! ## Schema Reference
//!
//! - `sql/source.sql` - `agent`, `sale`
//! - `sql/destination.sql` - `best_sales_teams`, `top_selling_products`,
//!   `branch_sales_performance`
//!
//! ## Module Organization
//!
//! - `types` - Aggregation units, result rows, run outcome
//! - `units` - The fixed sales units
//! - `source` - Source session and unit queries
//! - `db` - Destination replace transaction
//! - `engine` - `AggregationPipeline` orchestration
//! - `scheduler` - Async trigger and periodic runs
//! - `config` - Environment configuration
//! - `error` - `PipelineError`

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod source;
pub mod types;
pub mod units;

// Re-export commonly used types
pub use config::{PipelineConfig, SourceIsolation};
pub use db::{DestinationStore, ReplaceTransaction};
pub use engine::AggregationPipeline;
pub use error::PipelineError;
pub use scheduler::{run_scheduler, trigger, RunTrigger};
pub use source::SourceSession;
pub use types::{AggregationUnit, ColumnMapping, ResultRow, RunResult, RunSummary, UnitSummary};
pub use units::sales_units;
