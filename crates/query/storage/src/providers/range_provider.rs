//! Provider for the `fetched_ranges` table.
//!
//! Transactions and events may legitimately be absent from a block, so their
//! coverage cannot be derived from the rows themselves. Every range that was
//! fetched and stored is recorded here instead, keyed by entity kind and a
//! kind-specific scope.

use crate::StorageError;
use quarry_types::BlockRange;
use rusqlite::{Connection, params};
use tracing::trace;

/// Provides access to the recorded fetch coverage over a borrowed connection.
#[derive(Debug)]
pub(crate) struct FetchedRangeProvider<'c> {
    conn: &'c Connection,
}

impl<'c> FetchedRangeProvider<'c> {
    pub(crate) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Gets the merged coverage of `(kind, scope)`.
    pub(crate) fn ranges(&self, kind: &str, scope: &str) -> Result<Vec<BlockRange>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT start_block, stop_block FROM fetched_ranges \
             WHERE kind = ?1 AND scope = ?2 ORDER BY start_block",
        )?;
        let ranges = stmt
            .query_map(params![kind, scope], |row| Ok(BlockRange::new(row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BlockRange::merge(ranges))
    }

    /// Adds `range` to the coverage of `(kind, scope)`.
    ///
    /// Rows are compacted on every write so that the table holds exactly the
    /// merged ranges.
    pub(crate) fn record(
        &self,
        kind: &str,
        scope: &str,
        range: BlockRange,
    ) -> Result<(), StorageError> {
        if range.is_empty() {
            return Ok(());
        }
        let mut ranges = self.ranges(kind, scope)?;
        ranges.push(range);
        let merged = BlockRange::merge(ranges);

        self.conn.execute(
            "DELETE FROM fetched_ranges WHERE kind = ?1 AND scope = ?2",
            params![kind, scope],
        )?;
        let mut insert = self.conn.prepare_cached(
            "INSERT INTO fetched_ranges (kind, scope, start_block, stop_block) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for r in &merged {
            insert.execute(params![kind, scope, r.start, r.stop])?;
        }
        let ranges = merged.len();
        trace!(target: "cache", kind, scope, %range, ranges, "Recorded fetched range");
        Ok(())
    }
}
