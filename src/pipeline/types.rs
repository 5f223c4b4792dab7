//! Core data structures for the aggregation pipeline
//!
//! - `AggregationUnit` - one (read query, destination table, column mapping) triple
//! - `ResultRow` - one tuple produced by a unit's read query
//! - `RunResult` / `RunSummary` - outcome of a single pipeline run

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::Serialize;

/// Binding of one result-tuple position to a destination column
///
/// A mapping with no destination column is *dropped*: the query returns it,
/// the destination never sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Column name as produced by the read query
    pub result_column: String,
    /// Destination column, or `None` when the value is not written
    pub destination_column: Option<String>,
}

impl ColumnMapping {
    /// Write the result column to a destination column of the same name
    pub fn keep(column: &str) -> Self {
        Self::rename(column, column)
    }

    /// Write the result column to a differently named destination column
    pub fn rename(result_column: &str, destination_column: &str) -> Self {
        Self {
            result_column: result_column.to_string(),
            destination_column: Some(destination_column.to_string()),
        }
    }

    /// Accept the result column but never write it
    pub fn dropped(result_column: &str) -> Self {
        Self {
            result_column: result_column.to_string(),
            destination_column: None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.destination_column.is_none()
    }
}

/// One aggregation unit: a source read query and where its rows land
///
/// `column_mapping` has exactly one entry per result column, in query order.
#[derive(Debug, Clone)]
pub struct AggregationUnit {
    pub name: String,
    pub read_query: String,
    pub destination_table: String,
    pub column_mapping: Vec<ColumnMapping>,
}

impl AggregationUnit {
    pub fn new(name: &str, read_query: &str, destination_table: &str) -> Self {
        Self {
            name: name.to_string(),
            read_query: read_query.to_string(),
            destination_table: destination_table.to_string(),
            column_mapping: Vec::new(),
        }
    }

    pub fn with_column(mut self, mapping: ColumnMapping) -> Self {
        self.column_mapping.push(mapping);
        self
    }

    /// Number of values every result row must carry
    pub fn result_width(&self) -> usize {
        self.column_mapping.len()
    }

    /// `(result position, destination column)` for every written column
    pub fn written_columns(&self) -> Vec<(usize, &str)> {
        self.column_mapping
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| m.destination_column.as_deref().map(|col| (idx, col)))
            .collect()
    }
}

/// Ordered tuple of scalar values returned by a read query
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow(pub Vec<Value>);

impl ResultRow {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }
}

/// Two-valued outcome handed to whoever triggered the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Success,
    Failure(String),
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Success)
    }
}

/// Rows written for one unit during a successful run
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub name: String,
    pub destination_table: String,
    pub rows_written: usize,
}

/// Log-only account of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub units: Vec<UnitSummary>,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.units.iter().map(|u| u.rows_written).sum()
    }
}
