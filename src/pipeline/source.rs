//! Read side of a run: the source session and unit queries
//!
//! The session is opened read-only (`SQLITE_OPEN_READ_ONLY` + `PRAGMA query_only`).
//! With [`SourceIsolation::Snapshot`] every unit query runs inside one read
//! transaction, so all units see the same source state. With
//! [`SourceIsolation::PerQuery`] each query sees whatever is committed when it
//! starts; concurrent source writers can make units disagree with each other.

use super::config::SourceIsolation;
use super::error::PipelineError;
use super::types::{AggregationUnit, ResultRow};
use crate::sqlite_pragma::{apply_session_pragmas, open_existing};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::time::Duration;

/// Read-only session against the source store, scoped to one run
///
/// Dropping the session ends any open snapshot.
pub struct SourceSession {
    conn: Connection,
}

impl SourceSession {
    /// Open the source store and, in snapshot mode, begin the read transaction
    pub fn open(
        url: &str,
        isolation: SourceIsolation,
        busy_timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let conn = open_existing(url, true).map_err(PipelineError::Connection)?;
        apply_session_pragmas(&conn, busy_timeout)?;
        conn.pragma_update(None, "query_only", true)
            .map_err(PipelineError::Connection)?;

        if isolation == SourceIsolation::Snapshot {
            // DEFERRED: the snapshot is pinned by the first unit's read
            conn.execute_batch("BEGIN DEFERRED")
                .map_err(PipelineError::Connection)?;
        }

        log::debug!("📥 Source session opened ({})", isolation.as_str());

        Ok(Self { conn })
    }

    /// Run one unit's read query and materialize its rows
    pub fn read(&self, unit: &AggregationUnit) -> Result<Vec<ResultRow>, PipelineError> {
        fetch_rows(&self.conn, unit)
    }

    /// End the session, releasing the snapshot if one is held
    pub fn close(self) -> Result<(), PipelineError> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .map_err(PipelineError::Query)?;
        }
        Ok(())
    }
}

impl Drop for SourceSession {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("⚠️  Failed to release source snapshot: {}", e);
            }
        }
    }
}

/// Execute `unit.read_query` and collect every row
///
/// The query must produce exactly `unit.result_width()` columns; anything
/// else is a [`PipelineError::Mapping`] and nothing is read.
pub fn fetch_rows(conn: &Connection, unit: &AggregationUnit) -> Result<Vec<ResultRow>, PipelineError> {
    let mut stmt = conn
        .prepare(&unit.read_query)
        .map_err(PipelineError::Query)?;

    let width = stmt.column_count();
    if width != unit.result_width() {
        return Err(PipelineError::Mapping {
            unit: unit.name.clone(),
            expected: unit.result_width(),
            actual: width,
        });
    }

    let row_iter = stmt
        .query_map([], |row| {
            (0..width)
                .map(|idx| row.get::<_, Value>(idx))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map(ResultRow)
        })
        .map_err(PipelineError::Query)?;

    let mut rows = Vec::new();
    for row in row_iter {
        rows.push(row.map_err(PipelineError::Query)?);
    }

    log::debug!("📥 {}: fetched {} rows from source", unit.name, rows.len());

    Ok(rows)
}
