//! Destination writer: full replace of unit tables inside one transaction
//!
//! Per unit:
//! - `DELETE FROM <table>`
//! - `INSERT INTO <table> (cols...) VALUES (?1, ...)` once per result row
//!
//! Nothing becomes visible until [`ReplaceTransaction::commit`]. Dropping the
//! transaction instead rolls every unit back.
//!
//! The destination schema must already exist (see `sql/destination.sql`).

use super::error::PipelineError;
use super::types::{AggregationUnit, ResultRow};
use crate::sqlite_pragma::{apply_session_pragmas, open_existing};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::time::Duration;

/// Connection to the analytical store, scoped to one run
pub struct DestinationStore {
    conn: Connection,
}

impl DestinationStore {
    /// Open an existing destination store for writing
    ///
    /// Never creates the database file.
    pub fn open(url: &str, busy_timeout: Duration) -> Result<Self, PipelineError> {
        let conn = open_existing(url, false).map_err(PipelineError::Connection)?;
        apply_session_pragmas(&conn, busy_timeout)?;

        Ok(Self { conn })
    }

    /// Start the run's write transaction
    ///
    /// IMMEDIATE takes the write lock up front, so a second run against the
    /// same store waits (up to the busy timeout) instead of interleaving.
    pub fn begin(&mut self) -> Result<ReplaceTransaction<'_>, PipelineError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(PipelineError::Connection)?;

        Ok(ReplaceTransaction { tx })
    }
}

/// The single destination transaction of a run
pub struct ReplaceTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl ReplaceTransaction<'_> {
    /// Clear `unit.destination_table` and insert `rows`
    ///
    /// Dropped mapping entries are not written. Returns the number of rows
    /// inserted.
    pub fn replace(&self, unit: &AggregationUnit, rows: &[ResultRow]) -> Result<usize, PipelineError> {
        let columns = unit.written_columns();
        if columns.is_empty() {
            return Err(PipelineError::Config(format!(
                "unit {} writes no destination columns",
                unit.name
            )));
        }

        let table = quote_ident(&unit.destination_table);

        let deleted = self
            .tx
            .execute(&format!("DELETE FROM {}", table), [])
            .map_err(PipelineError::Write)?;

        let mut stmt = self
            .tx
            .prepare_cached(&insert_sql(&table, &columns))
            .map_err(PipelineError::Write)?;

        for row in rows {
            if row.len() != unit.result_width() {
                return Err(PipelineError::Mapping {
                    unit: unit.name.clone(),
                    expected: unit.result_width(),
                    actual: row.len(),
                });
            }

            stmt.execute(params_from_iter(columns.iter().map(|(idx, _)| &row.0[*idx])))
                .map_err(PipelineError::Write)?;
        }

        log::debug!(
            "🧹 {}: replaced {} stale rows with {} new rows",
            unit.destination_table,
            deleted,
            rows.len()
        );

        Ok(rows.len())
    }

    /// Make every unit's replace visible at once
    pub fn commit(self) -> Result<(), PipelineError> {
        self.tx.commit().map_err(PipelineError::Write)
    }
}

fn insert_sql(table: &str, columns: &[(usize, &str)]) -> String {
    let names: Vec<String> = columns.iter().map(|(_, col)| quote_ident(col)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("?{}", n)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    )
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
