//! Whole-store snapshots and their text-safe envelope.
//!
//! # Responsibility
//! - Serialize a store to the bytes of a standalone SQLite file.
//! - Materialize received bytes as a transient read-only store.
//! - Wrap snapshot bytes in a base64 envelope for JSON transport.
//!
//! # Invariants
//! - A transient store lives in its own temporary directory, which is
//!   removed when the `SnapshotStore` is dropped, on every exit path.
//! - Decoding never touches the target store.
//! - Incoming rows are read in `rowid` order, so one snapshot always yields
//!   the same batch.

use crate::db::open_db_read_only;
use crate::model::notebook::IncomingNotebook;
use crate::repo::notebook_repo::ensure_notebooks_table;
use crate::sync::{SyncError, SyncResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::debug;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tempfile::TempDir;

const SNAPSHOT_FILE_NAME: &str = "snapshot.sqlite3";
const SCRATCH_PREFIX: &str = "nbsync-snapshot-";

/// Received bytes cannot be used as a notebook store.
#[derive(Debug)]
pub enum DecodeError {
    /// Envelope text is not valid base64.
    Envelope(base64::DecodeError),
    /// Bytes are not an SQLite file with a usable `notebooks` table.
    NotAStore(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Envelope(err) => write!(f, "snapshot envelope is not valid base64: {err}"),
            Self::NotAStore(message) => write!(f, "snapshot is not a notebook store: {message}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Envelope(err) => Some(err),
            Self::NotAStore(_) => None,
        }
    }
}

/// Serialized store plus its row count at serialization time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub notebook_count: u64,
}

impl Snapshot {
    /// Returns the snapshot bytes as base64 text.
    pub fn to_envelope(&self) -> String {
        encode_envelope(&self.bytes)
    }
}

pub fn encode_envelope(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes envelope text; ASCII whitespace anywhere (line wrapping
/// included) is ignored.
pub fn decode_envelope(text: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact).map_err(DecodeError::Envelope)
}

/// Copies the database behind `conn` into standalone file bytes.
///
/// Uses `VACUUM INTO`, which reads one consistent state of the store. The
/// returned count is read from the copy itself, so it always matches the
/// bytes. Must not be called while a transaction is open on `conn`.
pub fn serialize_store(conn: &Connection) -> SyncResult<Snapshot> {
    let scratch = scratch_dir()?;
    let path = scratch.path().join(SNAPSHOT_FILE_NAME);
    let path_text = path.to_str().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "scratch path is not valid UTF-8",
        )
    })?;
    conn.execute("VACUUM INTO ?1;", [path_text])?;

    let notebook_count = {
        let copy = open_db_read_only(&path)?;
        count_rows(&copy)?
    };
    let bytes = std::fs::read(&path)?;
    debug!(
        "event=snapshot_serialize module=sync status=ok bytes={} notebook_count={}",
        bytes.len(),
        notebook_count
    );
    Ok(Snapshot {
        bytes,
        notebook_count,
    })
}

fn count_rows(conn: &Connection) -> SyncResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM notebooks;", [], |row| row.get(0))?;
    u64::try_from(count).map_err(|_| not_a_store(format!("negative notebook count `{count}`")))
}

/// Transient read-only store decoded from snapshot bytes.
pub struct SnapshotStore {
    // Declared before `_scratch` so the connection closes before the
    // directory is removed.
    conn: Connection,
    _scratch: TempDir,
}

impl SnapshotStore {
    /// Writes `bytes` to a scratch file and opens it read-only.
    ///
    /// # Errors
    /// - `SyncError::Decode` when the bytes are not a notebook store.
    /// - `SyncError::Io` when the scratch file cannot be written.
    pub fn from_bytes(bytes: &[u8]) -> SyncResult<Self> {
        let scratch = scratch_dir()?;
        let path = scratch.path().join(SNAPSHOT_FILE_NAME);
        std::fs::write(&path, bytes)?;
        Self::open(&path, scratch)
    }

    fn open(path: &Path, scratch: TempDir) -> SyncResult<Self> {
        let conn = open_db_read_only(path).map_err(|err| not_a_store(err.to_string()))?;
        ensure_notebooks_table(&conn).map_err(|err| not_a_store(err.to_string()))?;
        Ok(Self {
            conn,
            _scratch: scratch,
        })
    }

    /// Reads every `(name, hash, code)` row in insertion order.
    pub fn read_incoming(&self) -> SyncResult<Vec<IncomingNotebook>> {
        self.read_rows().map_err(|err| match err {
            SyncError::StoreUnavailable(inner) => not_a_store(inner.to_string()),
            other => other,
        })
    }

    fn read_rows(&self) -> SyncResult<Vec<IncomingNotebook>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, hash, code FROM notebooks ORDER BY rowid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut incoming = Vec::new();
        while let Some(row) = rows.next()? {
            let name: Option<String> = row.get(0)?;
            let hash: Option<String> = row.get(1)?;
            let code: Option<String> = row.get(2)?;
            match (name, hash, code) {
                (Some(name), Some(hash), Some(code)) => {
                    incoming.push(IncomingNotebook { name, hash, code })
                }
                _ => {
                    return Err(not_a_store(format!(
                        "row {} has a NULL name, hash or code",
                        incoming.len() + 1
                    )))
                }
            }
        }
        Ok(incoming)
    }
}

fn scratch_dir() -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()
}

fn not_a_store(message: String) -> SyncError {
    SyncError::Decode(DecodeError::NotAStore(message))
}
