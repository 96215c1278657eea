use rusqlite::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that may occur while interacting with the local cache.
///
/// This enum is used across all implementations of the cache traits.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying SQLite call failed.
    #[error("Database error")]
    Database(#[source] rusqlite::Error),

    /// The cache file is malformed. It must be purged and re-initialized.
    #[error("Cache is corrupted, purge and re-initialize it: {0}")]
    CacheCorruption(String),

    /// The cache file belongs to a different network.
    #[error("Cache belongs to chain {found}, expected chain {expected}")]
    NetworkMismatch {
        /// The chain id the caller asked for.
        expected: u64,
        /// The chain id recorded in the cache file.
        found: u64,
    },

    /// No cache file exists at the given path.
    #[error("Cache not initialized at {}", .0.display())]
    NotInitialized(PathBuf),

    /// A cache file already exists at the given path.
    #[error("Cache already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// A raw query attempted to modify the cache.
    #[error("Only read-only statements may be run against the cache")]
    ReadOnly,

    /// An I/O error while preparing the cache location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(failure.code, ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) =>
            {
                Self::CacheCorruption(err.to_string())
            }
            rusqlite::Error::FromSqlConversionFailure(..) |
            rusqlite::Error::IntegralValueOutOfRange(..) |
            rusqlite::Error::InvalidColumnType(..) => Self::CacheCorruption(err.to_string()),
            _ => Self::Database(err),
        }
    }
}
