pub mod pipeline;
pub mod sqlite_pragma;

pub use pipeline::{AggregationPipeline, PipelineConfig, PipelineError, RunResult};
