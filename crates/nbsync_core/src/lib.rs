//! Core notebook sync logic.
//! This crate is the single source of truth for merge invariants: content
//! fingerprints, the notebook store, the append-only reconciler, the trusted
//! seeder and whole-store snapshots.

pub mod db;
pub mod fingerprint;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;
pub mod sync;
pub mod template;

pub use fingerprint::{fingerprint, is_valid_fingerprint};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::notebook::{IncomingNotebook, Notebook};
pub use repo::notebook_repo::{
    NotebookRepository, RepoError, RepoResult, SqliteNotebookRepository, UpsertOutcome,
};
pub use seed::{
    DirectorySeedSource, SeedMode, SeedNotebook, SeedReport, SeedSource, SeedSourceError,
};
pub use service::sync_service::{StoreLocation, SyncService, UploadSummary};
pub use sync::{
    decode_envelope, encode_envelope, reconcile, DecodeError, IncomingFilter, MergeOutcome,
    ReconcileOptions, Snapshot, SyncError, SyncResult, DEFAULT_MAX_RENAME_ATTEMPTS,
};
pub use template::{is_marimo_app, render_template, DEFAULT_TEMPLATE, TEMPLATE_NAME};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
