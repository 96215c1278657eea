//! Provider for the `metadata` key/value table.

use crate::StorageError;
use rusqlite::{Connection, OptionalExtension, params};

/// Provides access to cache metadata over a borrowed connection.
#[derive(Debug)]
pub(crate) struct MetadataProvider<'c> {
    conn: &'c Connection,
}

impl<'c> MetadataProvider<'c> {
    pub(crate) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    }

    /// Gets a required key, treating its absence as corruption.
    pub(crate) fn require(&self, key: &str) -> Result<String, StorageError> {
        self.get(key)?
            .ok_or_else(|| StorageError::CacheCorruption(format!("missing metadata key `{key}`")))
    }

    pub(crate) fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
