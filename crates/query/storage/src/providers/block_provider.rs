//! Provider for the `blocks` table.

use crate::{StorageError, codec};
use quarry_types::{BlockRange, BlockRecord};
use rusqlite::{Connection, Row, params};
use tracing::{debug, error};

const SELECT_BLOCKS: &str = "SELECT number, hash, parent_hash, timestamp, gas_limit, gas_used, \
     base_fee_per_gas, difficulty, total_difficulty, size, miner, num_transactions \
     FROM blocks WHERE number >= ?1 AND number < ?2 ORDER BY number";

/// Islands of consecutive block numbers: `number - row_number` is constant
/// within a run and changes across every gap.
const BLOCK_RUNS: &str = "SELECT MIN(number), MAX(number) FROM (\
     SELECT number, number - ROW_NUMBER() OVER (ORDER BY number) AS run FROM blocks\
     ) GROUP BY run ORDER BY 1";

/// Provides access to cached block headers over a borrowed connection.
#[derive(Debug)]
pub(crate) struct BlockProvider<'c> {
    conn: &'c Connection,
}

impl<'c> BlockProvider<'c> {
    pub(crate) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts blocks, leaving already cached numbers untouched.
    pub(crate) fn insert(&self, blocks: &[BlockRecord]) -> Result<usize, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO blocks (number, hash, parent_hash, timestamp, gas_limit, gas_used, \
             base_fee_per_gas, difficulty, total_difficulty, size, miner, num_transactions) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
             ON CONFLICT(number) DO NOTHING",
        )?;

        let mut inserted = 0;
        for block in blocks {
            inserted += stmt
                .execute(params![
                    block.number,
                    codec::hex(&block.hash),
                    codec::hex(&block.parent_hash),
                    block.timestamp,
                    block.gas_limit,
                    block.gas_used,
                    block.base_fee_per_gas,
                    block.difficulty.to_string(),
                    block.total_difficulty.map(|d| d.to_string()),
                    block.size,
                    codec::hex(&block.miner),
                    block.num_transactions,
                ])
                .inspect_err(|err| {
                    error!(target: "cache", number = block.number, ?err, "Failed to insert block");
                })?;
        }
        debug!(target: "cache", total = blocks.len(), inserted, "Stored blocks");
        Ok(inserted)
    }

    /// Gets the cached blocks in `range`, ordered by number.
    pub(crate) fn get_range(&self, range: BlockRange) -> Result<Vec<BlockRecord>, StorageError> {
        let mut stmt = self.conn.prepare_cached(SELECT_BLOCKS)?;
        let blocks = stmt
            .query_map(params![range.start, range.stop], block_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    /// Gets the runs of consecutive cached block numbers.
    pub(crate) fn contiguous_ranges(&self) -> Result<Vec<BlockRange>, StorageError> {
        let mut stmt = self.conn.prepare_cached(BLOCK_RUNS)?;
        let ranges = stmt
            .query_map([], |row| {
                let first: u64 = row.get(0)?;
                let last: u64 = row.get(1)?;
                Ok(BlockRange::new(first, last + 1))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ranges)
    }
}

fn block_from_row(row: &Row<'_>) -> rusqlite::Result<BlockRecord> {
    Ok(BlockRecord {
        number: row.get(0)?,
        hash: codec::b256(row, 1)?,
        parent_hash: codec::b256(row, 2)?,
        timestamp: row.get(3)?,
        gas_limit: row.get(4)?,
        gas_used: row.get(5)?,
        base_fee_per_gas: row.get(6)?,
        difficulty: codec::u256(row, 7)?,
        total_difficulty: codec::optional_u256(row, 8)?,
        size: row.get(9)?,
        miner: codec::address(row, 10)?,
        num_transactions: row.get(11)?,
    })
}
