//! Trusted bulk loading with overwrite-by-name.
//!
//! # Responsibility
//! - Load `(name, code)` pairs from a trusted source into a store.
//! - Report how many rows were added, updated or left unchanged.
//!
//! # Invariants
//! - Never renames and never emits collision warnings.
//! - Overwrites keep `created_at` and refresh `updated_at`.
//! - Must not be fed client-submitted data; it can replace existing code.

use crate::fingerprint::fingerprint;
use crate::repo::notebook_repo::{NotebookRepository, RepoResult, UpsertOutcome};
use log::debug;

pub mod source;

pub use source::{DirectorySeedSource, SeedSource, SeedSourceError, DEFAULT_TEMPLATE_FILE};

/// One trusted `(name, code)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedNotebook {
    pub name: String,
    pub code: String,
}

impl SeedNotebook {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// Overwrite policy for names that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMode {
    /// Overwrite every existing row (population from canonical sources).
    #[default]
    Always,
    /// Overwrite only rows whose hash differs (client defaults refresh).
    WhenChanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.unchanged
    }
}

/// Writes every item into `target` with last-writer-wins semantics.
pub fn seed<R: NotebookRepository + ?Sized>(
    target: &R,
    items: &[SeedNotebook],
    mode: SeedMode,
) -> RepoResult<SeedReport> {
    let mut report = SeedReport::default();

    for item in items {
        let hash = fingerprint(&item.code);
        let existing = target.get_notebook(&item.name)?;

        match existing {
            None => {
                target.insert_unique(&item.name, &hash, &item.code)?;
                debug!("event=seed_add module=seed name={}", item.name);
                report.added += 1;
            }
            Some(current) if mode == SeedMode::WhenChanged && current.has_content(&hash) => {
                report.unchanged += 1;
            }
            Some(_) => match target.upsert(&item.name, &hash, &item.code)? {
                UpsertOutcome::Updated => {
                    debug!("event=seed_update module=seed name={}", item.name);
                    report.updated += 1;
                }
                UpsertOutcome::Inserted => report.added += 1,
            },
        }
    }

    Ok(report)
}
