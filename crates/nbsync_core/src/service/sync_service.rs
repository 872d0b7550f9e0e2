//! One side's notebook store and its sync use-cases.
//!
//! # Responsibility
//! - Own the store connection for one side (client or server).
//! - Expose upload (merge), download (snapshot), seeding and lookups.
//! - Give every exposed operation exactly one transaction scope.
//!
//! # Invariants
//! - All callers are serialized on the connection lock, so two uploads
//!   never interleave their name checks and inserts.
//! - Write operations run in `BEGIN IMMEDIATE` transactions; any error drops
//!   the transaction, which rolls back every insert of the batch.
//! - Snapshot bytes are fully decoded before the target is touched.

use crate::db::{open_db, open_db_in_memory};
use crate::model::notebook::{IncomingNotebook, Notebook};
use crate::repo::notebook_repo::{NotebookRepository, SqliteNotebookRepository};
use crate::seed::{seed, SeedMode, SeedNotebook, SeedReport};
use crate::sync::snapshot::serialize_store;
use crate::sync::{
    decode_envelope, reconcile, MergeOutcome, ReconcileOptions, Snapshot, SnapshotStore,
    SyncError, SyncResult,
};
use crate::template::{DEFAULT_TEMPLATE, TEMPLATE_NAME};
use log::{error, info, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, TransactionBehavior};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => write!(f, ":memory:"),
        }
    }
}

/// Result of merging a foreign snapshot into this store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// Row count of this store after the merge committed.
    pub notebook_count: u64,
    pub warnings: Vec<String>,
    pub inserted: usize,
    pub unchanged: usize,
}

/// Sync use-cases over one notebook store.
pub struct SyncService {
    conn: Mutex<Connection>,
    location: StoreLocation,
    options: ReconcileOptions,
}

impl SyncService {
    /// Opens (creating if needed) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = open_db(path)?;
        Self::from_connection(conn, StoreLocation::File(path.to_path_buf()))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> SyncResult<Self> {
        Self::from_connection(open_db_in_memory()?, StoreLocation::Memory)
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, location: StoreLocation) -> SyncResult<Self> {
        SqliteNotebookRepository::try_new(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
            options: ReconcileOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn get(&self, name: &str) -> SyncResult<Option<Notebook>> {
        self.read(|repo| Ok(repo.get_notebook(name)?))
    }

    pub fn list(&self) -> SyncResult<Vec<Notebook>> {
        self.read(|repo| Ok(repo.list_notebooks()?))
    }

    pub fn count(&self) -> SyncResult<u64> {
        self.read(|repo| Ok(repo.count_notebooks()?))
    }

    /// Returns the code of the `template` row, or the built-in default.
    pub fn template_code(&self) -> SyncResult<String> {
        Ok(self
            .get(TEMPLATE_NAME)?
            .map(|notebook| notebook.code)
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()))
    }

    /// Decodes a base64 envelope and merges the snapshot it carries.
    pub fn upload_envelope(&self, envelope: &str) -> SyncResult<UploadSummary> {
        let bytes = decode_envelope(envelope).inspect_err(|err| {
            warn!(
                "event=sync_upload module=sync status=error error_code=decode_error error={}",
                err
            );
        })?;
        self.upload_snapshot(&bytes)
    }

    /// Merges a foreign snapshot into this store.
    ///
    /// # Errors
    /// - `Decode` when the bytes are not a notebook store; nothing is written.
    /// - Any reconciliation error; the whole batch is rolled back.
    pub fn upload_snapshot(&self, bytes: &[u8]) -> SyncResult<UploadSummary> {
        self.upload_snapshot_with(bytes, &self.options)
    }

    /// Merges a foreign snapshot using explicit options instead of the
    /// store defaults (e.g. the marimo-only filter of a client pull).
    pub fn upload_snapshot_with(
        &self,
        bytes: &[u8],
        options: &ReconcileOptions,
    ) -> SyncResult<UploadSummary> {
        let started_at = Instant::now();
        info!(
            "event=sync_upload module=sync status=start bytes={}",
            bytes.len()
        );

        let result = SnapshotStore::from_bytes(bytes)
            .and_then(|snapshot| snapshot.read_incoming())
            .and_then(|incoming| self.merge_counted(&incoming, options));

        match result {
            Ok((outcome, notebook_count)) => {
                info!(
                    "event=sync_upload module=sync status=ok inserted={} renamed={} unchanged={} skipped={} notebook_count={} duration_ms={}",
                    outcome.inserted.len(),
                    outcome.renamed,
                    outcome.unchanged,
                    outcome.skipped,
                    notebook_count,
                    started_at.elapsed().as_millis()
                );
                Ok(UploadSummary {
                    notebook_count,
                    inserted: outcome.inserted.len(),
                    unchanged: outcome.unchanged,
                    warnings: outcome.warnings,
                })
            }
            Err(err) => {
                error!(
                    "event=sync_upload module=sync status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Reconciles an already decoded batch into this store.
    pub fn merge_incoming(&self, incoming: &[IncomingNotebook]) -> SyncResult<MergeOutcome> {
        self.merge_counted(incoming, &self.options)
            .map(|(outcome, _)| outcome)
    }

    fn merge_counted(
        &self,
        incoming: &[IncomingNotebook],
        options: &ReconcileOptions,
    ) -> SyncResult<(MergeOutcome, u64)> {
        self.write(|repo| {
            let outcome = reconcile(repo, incoming, options)?;
            let count = repo.count_notebooks()?;
            Ok((outcome, count))
        })
    }

    /// Serializes the whole store.
    pub fn download_snapshot(&self) -> SyncResult<Snapshot> {
        let started_at = Instant::now();
        let conn = self.conn.lock();
        let result = SqliteNotebookRepository::try_new(&conn)
            .map_err(SyncError::from)
            .and_then(|_| serialize_store(&conn));

        match &result {
            Ok(snapshot) => info!(
                "event=sync_download module=sync status=ok bytes={} notebook_count={} duration_ms={}",
                snapshot.bytes.len(),
                snapshot.notebook_count,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=sync_download module=sync status=error error_code={} error={}",
                err.code(),
                err
            ),
        }
        result
    }

    /// Loads trusted notebooks with overwrite-by-name semantics.
    ///
    /// Never call this with client-submitted data.
    pub fn seed(&self, items: &[SeedNotebook], mode: SeedMode) -> SyncResult<SeedReport> {
        let started_at = Instant::now();
        let result = self.write(|repo| Ok(seed(repo, items, mode)?));
        match &result {
            Ok(report) => info!(
                "event=seed module=seed status=ok mode={:?} added={} updated={} unchanged={} duration_ms={}",
                mode,
                report.added,
                report.updated,
                report.unchanged,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=seed module=seed status=error error_code={} error={}",
                err.code(),
                err
            ),
        }
        result
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&SqliteNotebookRepository<'_>) -> SyncResult<T>,
    ) -> SyncResult<T> {
        let conn = self.conn.lock();
        let repo = SqliteNotebookRepository::try_new(&conn)?;
        op(&repo)
    }

    fn write<T>(
        &self,
        op: impl FnOnce(&SqliteNotebookRepository<'_>) -> SyncResult<T>,
    ) -> SyncResult<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = {
            let repo = SqliteNotebookRepository::try_new(&tx)?;
            op(&repo)?
        };
        tx.commit()?;
        Ok(value)
    }
}
