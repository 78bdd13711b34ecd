//! Backend selection, consumed once at process start.
//!
//! # Responsibility
//! - Read the storage kind and backend parameters from environment
//!   variables.
//! - Reject unrecognized values instead of defaulting silently.
//!
//! # Invariants
//! - `LODGEBOOK_STORAGE` accepts `file` (default) or `db`.
//! - The relational backend is SQLite, so its parameters collapse to a
//!   database path; `:memory:` selects an ephemeral database.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_STORAGE: &str = "LODGEBOOK_STORAGE";
pub const ENV_FILE_PATH: &str = "LODGEBOOK_FILE_PATH";
pub const ENV_DB_PATH: &str = "LODGEBOOK_DB_PATH";

const DEFAULT_FILE_PATH: &str = "lodgebook.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// File-backed document store at the given path.
    File { path: PathBuf },
    /// SQLite database at the given path (or `:memory:`).
    Db { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownStorageKind(String),
    MissingDbPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownStorageKind(value) => {
                write!(f, "unsupported {ENV_STORAGE} value `{value}`; expected file|db")
            }
            Self::MissingDbPath => {
                write!(f, "{ENV_DB_PATH} must be set when {ENV_STORAGE}=db")
            }
        }
    }
}

impl Error for ConfigError {}

impl StorageConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(
            env::var(ENV_STORAGE).ok().as_deref(),
            env::var(ENV_FILE_PATH).ok().as_deref(),
            env::var(ENV_DB_PATH).ok().as_deref(),
        )
    }

    /// Pure resolution step, separated from the environment for tests.
    pub fn resolve(
        kind: Option<&str>,
        file_path: Option<&str>,
        db_path: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let kind = kind.map(str::trim).filter(|value| !value.is_empty());
        match kind.map(str::to_ascii_lowercase).as_deref() {
            None | Some("file") => Ok(Self::File {
                path: PathBuf::from(file_path.unwrap_or(DEFAULT_FILE_PATH)),
            }),
            Some("db") => {
                let path = db_path
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .ok_or(ConfigError::MissingDbPath)?;
                Ok(Self::Db {
                    path: PathBuf::from(path),
                })
            }
            Some(other) => Err(ConfigError::UnknownStorageKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StorageConfig};
    use std::path::PathBuf;

    #[test]
    fn defaults_to_file_backend() {
        let config = StorageConfig::resolve(None, None, None).unwrap();
        assert_eq!(
            config,
            StorageConfig::File {
                path: PathBuf::from("lodgebook.json")
            }
        );
    }

    #[test]
    fn db_backend_requires_a_path() {
        assert_eq!(
            StorageConfig::resolve(Some("db"), None, None),
            Err(ConfigError::MissingDbPath)
        );
        let config = StorageConfig::resolve(Some("DB"), None, Some(":memory:")).unwrap();
        assert_eq!(
            config,
            StorageConfig::Db {
                path: PathBuf::from(":memory:")
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(
            StorageConfig::resolve(Some("mysql"), None, None),
            Err(ConfigError::UnknownStorageKind("mysql".to_string()))
        );
    }
}
