//! One-shot trigger: run the sales aggregation once and report the outcome
//!
//! Usage:
//!   cargo run --release --bin aggregate_once
//!
//! Exit status 0 on success, 1 on a failed run or bad configuration.
//!
//! Environment variables: see `PipelineConfig::from_env`.

use dotenv::dotenv;
use log::error;
use salesflow::pipeline::{AggregationPipeline, PipelineConfig, RunResult};
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("Error during aggregation: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = AggregationPipeline::new(config);

    match pipeline.run() {
        RunResult::Success => {
            println!("Data aggregation completed successfully!");
            ExitCode::SUCCESS
        }
        RunResult::Failure(cause) => {
            eprintln!("Error during aggregation: {}", cause);
            ExitCode::FAILURE
        }
    }
}
