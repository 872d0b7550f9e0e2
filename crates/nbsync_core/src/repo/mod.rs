//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for notebook stores.
//! - Isolate SQLite query details from sync orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NameConflict`) in addition to
//!   DB transport errors; callers branch on results, never on panics.
//! - Repositories never open transactions themselves; the caller owns the
//!   transaction scope of one exposed operation.

pub mod notebook_repo;
