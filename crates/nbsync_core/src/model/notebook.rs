//! Notebook domain model.
//!
//! # Responsibility
//! - Define the persisted notebook row and the foreign tuple consumed by
//!   the reconciler.
//!
//! # Invariants
//! - `name` is unique within a store and stable across syncs.
//! - `hash` is a pure function of `code` (see `crate::fingerprint`).
//! - Timestamps are assigned by the store, never by callers.

use crate::fingerprint::fingerprint;
use serde::{Deserialize, Serialize};

/// Stored notebook row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    /// Primary key within one store.
    pub name: String,
    /// Lowercase hex content fingerprint of `code`.
    pub hash: String,
    /// Full notebook source.
    pub code: String,
    /// SQLite `CURRENT_TIMESTAMP` text (UTC) at first insert.
    pub created_at: String,
    /// SQLite `CURRENT_TIMESTAMP` text (UTC) at last write.
    pub updated_at: String,
}

impl Notebook {
    /// Returns whether this row holds the same content as `hash`.
    pub fn has_content(&self, hash: &str) -> bool {
        self.hash == hash
    }
}

/// One `(name, hash, code)` tuple taken from a foreign store.
///
/// The hash is carried as supplied by the other side; both sides must use
/// the same fingerprint algorithm for identity checks to agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingNotebook {
    pub name: String,
    pub hash: String,
    pub code: String,
}

impl IncomingNotebook {
    pub fn new(
        name: impl Into<String>,
        hash: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
            code: code.into(),
        }
    }

    /// Builds a tuple whose hash is computed locally from `code`.
    pub fn from_code(name: impl Into<String>, code: impl Into<String>) -> Self {
        let code = code.into();
        let hash = fingerprint(&code);
        Self {
            name: name.into(),
            hash,
            code,
        }
    }
}

impl From<Notebook> for IncomingNotebook {
    fn from(value: Notebook) -> Self {
        Self {
            name: value.name,
            hash: value.hash,
            code: value.code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IncomingNotebook;
    use crate::fingerprint::fingerprint;

    #[test]
    fn from_code_fingerprints_the_body() {
        let incoming = IncomingNotebook::from_code("a", "print(1)");
        assert_eq!(incoming.hash, fingerprint("print(1)"));
        assert_eq!(incoming.name, "a");
    }

    #[test]
    fn incoming_serializes_as_name_hash_code() {
        let incoming = IncomingNotebook::new("a", "h", "c");
        let json = serde_json::to_value(&incoming).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "a", "hash": "h", "code": "c" })
        );
        let back: IncomingNotebook = serde_json::from_value(json).unwrap();
        assert_eq!(back, incoming);
    }
}
