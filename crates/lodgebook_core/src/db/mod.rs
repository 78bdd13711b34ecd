//! SQLite bootstrap and schema management.
//!
//! # Responsibility
//! - Open and configure connections for the relational backend.
//! - Apply the catalog schema exactly once per database.
//!
//! # Invariants
//! - Applied schema version is tracked via `PRAGMA user_version`.
//! - Returned connections have `foreign_keys=ON` and the schema fully
//!   applied before any application data is touched.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Version written to `PRAGMA user_version` once the schema is in.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Applies the catalog schema when the database is still at version 0.
///
/// A database stamped newer than [`SCHEMA_VERSION`] is refused rather
/// than read with wrong assumptions.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if current > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;
    Ok(())
}
