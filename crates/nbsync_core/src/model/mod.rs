//! Notebook record model shared by both sides of a sync.
//!
//! # Responsibility
//! - Define the stored record and the incoming (foreign) tuple shapes.
//!
//! # Invariants
//! - A notebook is identified by `name` within one store.
//! - `hash` is always the fingerprint of `code`.

pub mod notebook;
