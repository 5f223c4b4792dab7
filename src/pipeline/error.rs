//! Error type shared by every stage of an aggregation run

/// Failure of a pipeline run
///
/// Every variant is fatal for the run. Nothing is retried and nothing is
/// downgraded to a warning; callers only ever see the `Display` text.
#[derive(Debug)]
pub enum PipelineError {
    /// Missing or unparsable configuration
    Config(String),
    /// Source or destination could not be opened
    Connection(rusqlite::Error),
    /// Source query failed (malformed SQL, type error, ...)
    Query(rusqlite::Error),
    /// Result row width does not match the unit's column mapping
    Mapping {
        unit: String,
        expected: usize,
        actual: usize,
    },
    /// Destination delete/insert/commit rejected
    Write(rusqlite::Error),
    /// Another run holds the single-flight gate
    AlreadyRunning,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "Configuration error: {}", e),
            PipelineError::Connection(e) => write!(f, "Connection error: {}", e),
            PipelineError::Query(e) => write!(f, "Query error: {}", e),
            PipelineError::Mapping {
                unit,
                expected,
                actual,
            } => write!(
                f,
                "Mapping error: unit {} expects {} result columns, query returned {}",
                unit, expected, actual
            ),
            PipelineError::Write(e) => write!(f, "Write error: {}", e),
            PipelineError::AlreadyRunning => write!(f, "Aggregation run already in progress"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Connection(e) | PipelineError::Query(e) | PipelineError::Write(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}
