//! Notebook repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide get/list/count/insert/upsert over the `notebooks` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `insert_unique` never replaces an existing row; it reports
//!   `RepoError::NameConflict` instead.
//! - `upsert` keeps `created_at` and refreshes `updated_at`.
//! - `list_notebooks` returns rows in insertion (`rowid`) order.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::notebook::Notebook;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) const NOTEBOOKS_TABLE: &str = "notebooks";
pub(crate) const REQUIRED_COLUMNS: [&str; 3] = ["name", "hash", "code"];

const NOTEBOOK_SELECT_SQL: &str = "SELECT
    name,
    hash,
    code,
    CAST(COALESCE(created_at, '') AS TEXT) AS created_at,
    CAST(COALESCE(updated_at, '') AS TEXT) AS updated_at
FROM notebooks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for notebook persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// `insert_unique` target name is already taken.
    NameConflict(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NameConflict(name) => write!(f, "notebook name already exists: `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted notebook data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: expected schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of an overwrite-permitted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Repository interface for one notebook store.
pub trait NotebookRepository {
    fn get_notebook(&self, name: &str) -> RepoResult<Option<Notebook>>;
    fn contains_name(&self, name: &str) -> RepoResult<bool>;
    fn list_notebooks(&self) -> RepoResult<Vec<Notebook>>;
    fn count_notebooks(&self) -> RepoResult<u64>;
    /// Inserts a new row; fails with `NameConflict` when `name` exists.
    fn insert_unique(&self, name: &str, hash: &str, code: &str) -> RepoResult<Notebook>;
    /// Inserts or overwrites `hash`/`code` of the row named `name`.
    fn upsert(&self, name: &str, hash: &str, code: &str) -> RepoResult<UpsertOutcome>;
}

/// SQLite-backed notebook repository.
///
/// Accepts any connection, including an open `rusqlite::Transaction`
/// (through deref), so one exposed operation can run all repository calls
/// inside a single transaction.
pub struct SqliteNotebookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotebookRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_migrated(conn)?;
        ensure_notebooks_table(conn)?;
        Ok(Self { conn })
    }
}

impl NotebookRepository for SqliteNotebookRepository<'_> {
    fn get_notebook(&self, name: &str) -> RepoResult<Option<Notebook>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTEBOOK_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_notebook_row(row)?));
        }
        Ok(None)
    }

    fn contains_name(&self, name: &str) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM notebooks WHERE name = ?1;",
                [name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_notebooks(&self) -> RepoResult<Vec<Notebook>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTEBOOK_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut notebooks = Vec::new();
        while let Some(row) = rows.next()? {
            notebooks.push(parse_notebook_row(row)?);
        }
        Ok(notebooks)
    }

    fn count_notebooks(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notebooks;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative notebook count `{count}`")))
    }

    fn insert_unique(&self, name: &str, hash: &str, code: &str) -> RepoResult<Notebook> {
        let changed = self.conn.execute(
            "INSERT INTO notebooks (name, hash, code, created_at, updated_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO NOTHING;",
            params![name, hash, code],
        )?;
        if changed == 0 {
            return Err(RepoError::NameConflict(name.to_string()));
        }

        self.get_notebook(name)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted notebook `{name}` not found in read-back"))
        })
    }

    fn upsert(&self, name: &str, hash: &str, code: &str) -> RepoResult<UpsertOutcome> {
        let changed = self.conn.execute(
            "UPDATE notebooks
             SET
                hash = ?2,
                code = ?3,
                updated_at = CURRENT_TIMESTAMP
             WHERE name = ?1;",
            params![name, hash, code],
        )?;
        if changed > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        self.insert_unique(name, hash, code)?;
        Ok(UpsertOutcome::Inserted)
    }
}

fn parse_notebook_row(row: &Row<'_>) -> RepoResult<Notebook> {
    let name: Option<String> = row.get("name")?;
    let name = name.ok_or_else(|| RepoError::InvalidData("NULL value in notebooks.name".into()))?;
    Ok(Notebook {
        name,
        hash: row.get("hash")?,
        code: row.get("code")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn ensure_migrated(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

/// Checks that `conn` holds a `notebooks` table with the columns sync reads.
pub(crate) fn ensure_notebooks_table(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, NOTEBOOKS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(NOTEBOOKS_TABLE));
    }
    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, NOTEBOOKS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: NOTEBOOKS_TABLE,
                column,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
