//! Connection setup shared by the source and destination stores

use crate::pipeline::error::PipelineError;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;

/// Largest busy timeout SQLite accepts (milliseconds, C `int`)
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Open a store without ever creating it
///
/// Accepts plain paths and `file:` URIs. `read_only` selects
/// `SQLITE_OPEN_READ_ONLY`, otherwise `SQLITE_OPEN_READ_WRITE`.
pub fn open_existing(url: &str, read_only: bool) -> rusqlite::Result<Connection> {
    let access = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE
    };

    Connection::open_with_flags(
        url,
        access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

/// Apply per-session PRAGMAs
///
/// - busy timeout: how long to wait on a lock held by another connection
/// - foreign_keys: enforce declared references on destination writes
///
/// A busy timeout above [`MAX_BUSY_TIMEOUT_MS`] is a configuration error.
pub fn apply_session_pragmas(conn: &Connection, busy_timeout: Duration) -> Result<(), PipelineError> {
    if busy_timeout.as_millis() > u128::from(MAX_BUSY_TIMEOUT_MS) {
        return Err(PipelineError::Config(format!(
            "busy timeout of {}ms exceeds the {}ms maximum",
            busy_timeout.as_millis(),
            MAX_BUSY_TIMEOUT_MS
        )));
    }

    conn.busy_timeout(busy_timeout)
        .map_err(PipelineError::Connection)?;
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(PipelineError::Connection)?;
    Ok(())
}
