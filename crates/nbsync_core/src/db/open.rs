//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file, in-memory and read-only snapshot connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a writable connection.
//!
//! # Invariants
//! - Writable connections have migrations fully applied.
//! - Every connection waits at most `BUSY_TIMEOUT` for a competing writer.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

/// Upper bound for waiting on a lock held by another connection.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a notebook store file (creating it when missing) and applies all
/// pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_logged("file", || Connection::open(path), true)
}

/// Opens an in-memory notebook store and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_logged("memory", Connection::open_in_memory, true)
}

/// Opens an existing SQLite file read-only, without migrating it.
///
/// Used for transient snapshot stores received from the other side; the
/// caller is responsible for validating the table shape.
pub fn open_db_read_only(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_logged(
        "read_only",
        || {
            Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        },
        false,
    )
}

fn open_logged(
    mode: &'static str,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
    migrate: bool,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, migrate) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, migrate: bool) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if migrate {
        apply_migrations(conn)?;
    }
    Ok(())
}
