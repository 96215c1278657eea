//! Provider for the `transactions` table.

use crate::{StorageError, codec};
use quarry_types::{BlockRange, TransactionRecord};
use rusqlite::{Connection, Row, params};
use tracing::{debug, error};

/// Provides access to cached transactions over a borrowed connection.
#[derive(Debug)]
pub(crate) struct TransactionProvider<'c> {
    conn: &'c Connection,
}

impl<'c> TransactionProvider<'c> {
    pub(crate) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts transactions, leaving already cached hashes untouched.
    pub(crate) fn insert(&self, txs: &[TransactionRecord]) -> Result<usize, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO transactions (hash, block_number, transaction_index, sender, receiver, \
             value, nonce, gas_limit, gas_price, max_fee_per_gas, max_priority_fee_per_gas, \
             gas_used, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             ON CONFLICT(hash) DO NOTHING",
        )?;

        let mut inserted = 0;
        for tx in txs {
            inserted += stmt
                .execute(params![
                    codec::hex(&tx.hash),
                    tx.block_number,
                    tx.transaction_index,
                    codec::hex(&tx.sender),
                    tx.receiver.as_ref().map(codec::hex),
                    tx.value.to_string(),
                    tx.nonce,
                    tx.gas_limit,
                    tx.gas_price.map(|p| p.to_string()),
                    tx.max_fee_per_gas.map(|p| p.to_string()),
                    tx.max_priority_fee_per_gas.map(|p| p.to_string()),
                    tx.gas_used,
                    tx.status,
                ])
                .inspect_err(|err| {
                    error!(
                        target: "cache",
                        hash = ?tx.hash,
                        block_number = tx.block_number,
                        ?err,
                        "Failed to insert transaction"
                    );
                })?;
        }
        debug!(target: "cache", total = txs.len(), inserted, "Stored transactions");
        Ok(inserted)
    }

    /// Gets the cached transactions in `range`, in block then index order.
    pub(crate) fn get_range(
        &self,
        range: BlockRange,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT hash, block_number, transaction_index, sender, receiver, value, nonce, \
             gas_limit, gas_price, max_fee_per_gas, max_priority_fee_per_gas, gas_used, status \
             FROM transactions WHERE block_number >= ?1 AND block_number < ?2 \
             ORDER BY block_number, transaction_index",
        )?;
        let txs = stmt
            .query_map(params![range.start, range.stop], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(txs)
    }
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    Ok(TransactionRecord {
        hash: codec::b256(row, 0)?,
        block_number: row.get(1)?,
        transaction_index: row.get(2)?,
        sender: codec::address(row, 3)?,
        receiver: codec::optional_address(row, 4)?,
        value: codec::u256(row, 5)?,
        nonce: row.get(6)?,
        gas_limit: row.get(7)?,
        gas_price: codec::optional_u128(row, 8)?,
        max_fee_per_gas: codec::optional_u128(row, 9)?,
        max_priority_fee_per_gas: codec::optional_u128(row, 10)?,
        gas_used: row.get(11)?,
        status: row.get(12)?,
    })
}
