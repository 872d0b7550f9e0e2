//! Append-only reconciliation of a foreign batch into a target store.
//!
//! # Responsibility
//! - Decide, per incoming tuple, between skip / insert / insert-renamed.
//! - Produce human-readable warnings for every rename or skip.
//!
//! # Invariants
//! - Tuples are processed strictly in input order; rename decisions see
//!   rows inserted earlier in the same batch.
//! - Existing rows are never updated or deleted.
//! - The rename search is bounded by `ReconcileOptions::max_rename_attempts`
//!   plus a fixed number of random-suffix fallbacks.
//! - This module never opens or commits transactions; the caller wraps one
//!   call in a single transaction so a failure discards every insert.

use crate::model::notebook::{IncomingNotebook, Notebook};
use crate::repo::notebook_repo::NotebookRepository;
use crate::sync::{SyncError, SyncResult};
use crate::template::is_marimo_app;
use log::{debug, info, warn};
use uuid::Uuid;

/// Numbered suffixes tried before falling back to random suffixes.
pub const DEFAULT_MAX_RENAME_ATTEMPTS: u32 = 1000;
const FALLBACK_RENAME_ATTEMPTS: u32 = 8;
const FALLBACK_TOKEN_LEN: usize = 8;

/// Acceptance rule applied to incoming tuples before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncomingFilter {
    /// Merge every tuple (server-side upload).
    #[default]
    AcceptAll,
    /// Skip tuples whose code is not a marimo app (client-side pull).
    MarimoAppsOnly,
}

impl IncomingFilter {
    fn accepts(self, incoming: &IncomingNotebook) -> bool {
        match self {
            Self::AcceptAll => true,
            Self::MarimoAppsOnly => is_marimo_app(&incoming.code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub max_rename_attempts: u32,
    pub filter: IncomingFilter,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
            filter: IncomingFilter::AcceptAll,
        }
    }
}

/// Effects of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Rows added to the target, in insertion order.
    pub inserted: Vec<Notebook>,
    /// One line per rename or filtered tuple.
    pub warnings: Vec<String>,
    /// Tuples already present with identical name and hash.
    pub unchanged: usize,
    /// Tuples rejected by the incoming filter.
    pub skipped: usize,
    /// Tuples inserted under a derived name.
    pub renamed: usize,
}

/// Merges `incoming` into `target` without overwriting anything.
///
/// # Errors
/// - `StoreUnavailable` when the target cannot be read or written.
/// - `NameConflict` when a name resolved as free is taken at insert time.
/// - `RenameExhausted` when the bounded rename search finds no free name.
pub fn reconcile<R: NotebookRepository + ?Sized>(
    target: &R,
    incoming: &[IncomingNotebook],
    options: &ReconcileOptions,
) -> SyncResult<MergeOutcome> {
    let mut outcome = MergeOutcome::default();

    for item in incoming {
        if !options.filter.accepts(item) {
            warn!(
                "event=sync_skip module=sync status=ok name={} reason=not_marimo_app",
                item.name
            );
            outcome
                .warnings
                .push(format!("Skipped '{}': not a marimo app", item.name));
            outcome.skipped += 1;
            continue;
        }

        let target_name = match target.get_notebook(&item.name)? {
            Some(existing) if existing.has_content(&item.hash) => {
                debug!("event=sync_unchanged module=sync name={}", item.name);
                outcome.unchanged += 1;
                continue;
            }
            Some(_) => {
                let resolved = resolve_free_name(target, &item.name, options.max_rename_attempts)?;
                info!(
                    "event=sync_rename module=sync status=ok from={} to={} fallback={}",
                    item.name,
                    resolved.name,
                    resolved.fallback.is_some()
                );
                outcome.warnings.push(resolved.warning(&item.name));
                outcome.renamed += 1;
                resolved.name
            }
            None => item.name.clone(),
        };

        let notebook = target.insert_unique(&target_name, &item.hash, &item.code)?;
        outcome.inserted.push(notebook);
    }

    Ok(outcome)
}

struct ResolvedName {
    name: String,
    /// Set when numbered suffixes were exhausted; holds the attempt count.
    fallback: Option<u32>,
}

impl ResolvedName {
    fn warning(&self, original: &str) -> String {
        match self.fallback {
            None => format!("Renamed '{original}' to '{}'", self.name),
            Some(attempts) => format!(
                "Renamed '{original}' to '{}' (numbered suffixes exhausted after {attempts} attempts)",
                self.name
            ),
        }
    }
}

/// Finds the first free candidate among `name_1`, `name_2`, ... and then,
/// past the cap, among random `name_<token>` candidates.
fn resolve_free_name<R: NotebookRepository + ?Sized>(
    target: &R,
    name: &str,
    max_attempts: u32,
) -> SyncResult<ResolvedName> {
    for index in 1..=max_attempts {
        let candidate = format!("{name}_{index}");
        if !target.contains_name(&candidate)? {
            return Ok(ResolvedName {
                name: candidate,
                fallback: None,
            });
        }
    }

    warn!(
        "event=sync_rename module=sync status=fallback name={} attempts={}",
        name, max_attempts
    );
    for _ in 0..FALLBACK_RENAME_ATTEMPTS {
        let token = Uuid::new_v4().simple().to_string();
        let candidate = format!("{name}_{}", &token[..FALLBACK_TOKEN_LEN]);
        if !target.contains_name(&candidate)? {
            return Ok(ResolvedName {
                name: candidate,
                fallback: Some(max_attempts),
            });
        }
    }

    Err(SyncError::RenameExhausted {
        name: name.to_string(),
        attempts: max_attempts + FALLBACK_RENAME_ATTEMPTS,
    })
}
