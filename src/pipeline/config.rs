//! Pipeline configuration from environment variables

use super::error::PipelineError;
use crate::sqlite_pragma::MAX_BUSY_TIMEOUT_MS;
use std::env;
use std::time::Duration;

/// How the source reads of one run relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceIsolation {
    /// Each unit query sees the data committed when it starts
    PerQuery,
    /// All unit queries share one read transaction
    Snapshot,
}

impl SourceIsolation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "per_query" | "per-query" | "query" | "default" => Some(Self::PerQuery),
            "snapshot" | "run" | "consistent" => Some(Self::Snapshot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerQuery => "per_query",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Configuration for the aggregation pipeline
///
/// Built once by the binary and handed to `AggregationPipeline::new`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Connection string of the operational store (path or `file:` URI)
    pub source_url: String,

    /// Connection string of the analytical store (path or `file:` URI)
    pub destination_url: String,

    /// Read isolation across the units of one run
    pub source_isolation: SourceIsolation,

    /// Lock wait applied to both stores
    pub busy_timeout: Duration,

    /// Scheduler period in seconds (0 = single run)
    pub interval_secs: u64,
}

impl PipelineConfig {
    pub fn new(source_url: &str, destination_url: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            destination_url: destination_url.to_string(),
            source_isolation: SourceIsolation::PerQuery,
            busy_timeout: Duration::from_millis(5_000),
            interval_secs: 3_600,
        }
    }

    pub fn with_isolation(mut self, isolation: SourceIsolation) -> Self {
        self.source_isolation = isolation;
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SOURCE_DATABASE_URL` (falls back to `DATABASE_URL`, required)
    /// - `DESTINATION_DATABASE_URL` (required)
    /// - `SOURCE_ISOLATION` (default: per_query)
    /// - `DB_BUSY_TIMEOUT_MS` (default: 5000, at most `i32::MAX`)
    /// - `AGGREGATION_INTERVAL_SECS` (default: 3600)
    ///
    /// Empty or whitespace-only URLs count as unset.
    pub fn from_env() -> Result<Self, PipelineError> {
        let source_url = non_empty_var("SOURCE_DATABASE_URL")
            .or_else(|| non_empty_var("DATABASE_URL"))
            .ok_or_else(|| {
                PipelineError::Config("SOURCE_DATABASE_URL (or DATABASE_URL) must be set".to_string())
            })?;

        let destination_url = non_empty_var("DESTINATION_DATABASE_URL").ok_or_else(|| {
            PipelineError::Config("DESTINATION_DATABASE_URL must be set".to_string())
        })?;

        let source_isolation = match env::var("SOURCE_ISOLATION") {
            Ok(s) => SourceIsolation::parse(&s).ok_or_else(|| {
                PipelineError::Config(format!("Unknown SOURCE_ISOLATION: {}", s))
            })?,
            Err(_) => SourceIsolation::PerQuery,
        };

        let busy_timeout_ms: u64 = parse_var("DB_BUSY_TIMEOUT_MS", 5_000)?;
        if busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(PipelineError::Config(format!(
                "DB_BUSY_TIMEOUT_MS out of range: {} (max {})",
                busy_timeout_ms, MAX_BUSY_TIMEOUT_MS
            )));
        }
        let interval_secs: u64 = parse_var("AGGREGATION_INTERVAL_SECS", 3_600)?;

        Ok(Self {
            source_url,
            destination_url,
            source_isolation,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            interval_secs,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, PipelineError> {
    match env::var(name) {
        Ok(s) => s
            .trim()
            .parse()
            .map_err(|_| PipelineError::Config(format!("{} is not a valid number: {}", name, s))),
        Err(_) => Ok(default),
    }
}

/// Hide `user:password@` credentials in a connection string for logging
pub fn redact_url(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(idx) => url.split_at(idx + 3),
        None => return url.to_string(),
    };

    match rest.find('@') {
        Some(at) if !rest[..at].contains('/') => format!("{}***@{}", scheme, &rest[at + 1..]),
        _ => url.to_string(),
    }
}
