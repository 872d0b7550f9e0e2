//! Snapshot sync between two notebook stores.
//!
//! # Responsibility
//! - Reconcile a foreign batch into a target store without data loss.
//! - Encode/decode whole-store snapshots for transport.
//!
//! # Invariants
//! - Reconciliation only appends rows; existing `hash`/`code` never change.
//! - A failed sync leaves the target exactly as it was before the call.

use crate::db::DbError;
use crate::repo::notebook_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod reconciler;
pub mod snapshot;

pub use reconciler::{
    reconcile, IncomingFilter, MergeOutcome, ReconcileOptions, DEFAULT_MAX_RENAME_ATTEMPTS,
};
pub use snapshot::{decode_envelope, encode_envelope, DecodeError, Snapshot, SnapshotStore};

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of one sync operation. Renames are warnings, never errors.
#[derive(Debug)]
pub enum SyncError {
    /// Snapshot bytes are not a readable notebook store.
    Decode(DecodeError),
    /// Target store cannot be opened, read or written.
    StoreUnavailable(RepoError),
    /// A name chosen by the rename search was taken at insert time.
    NameConflict(String),
    /// No free name was found within the bounded rename search.
    RenameExhausted { name: String, attempts: u32 },
    /// Scratch file handling for a transient snapshot failed.
    Io(std::io::Error),
}

impl SyncError {
    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_error",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::NameConflict(_) => "name_conflict",
            Self::RenameExhausted { .. } => "rename_exhausted",
            Self::Io(_) => "snapshot_io",
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "invalid snapshot: {err}"),
            Self::StoreUnavailable(err) => write!(f, "notebook store unavailable: {err}"),
            Self::NameConflict(name) => write!(
                f,
                "internal consistency failure: resolved name `{name}` was already taken"
            ),
            Self::RenameExhausted { name, attempts } => write!(
                f,
                "no free name for `{name}` after {attempts} rename attempts"
            ),
            Self::Io(err) => write!(f, "snapshot scratch i/o failed: {err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::StoreUnavailable(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::NameConflict(_) | Self::RenameExhausted { .. } => None,
        }
    }
}

impl From<DecodeError> for SyncError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NameConflict(name) => Self::NameConflict(name),
            other => Self::StoreUnavailable(other),
        }
    }
}

impl From<DbError> for SyncError {
    fn from(value: DbError) -> Self {
        Self::StoreUnavailable(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StoreUnavailable(RepoError::from(value))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
