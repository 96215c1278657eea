//! Provider for the `contract_events` table.

use crate::{StorageError, codec};
use quarry_types::{BlockRange, ContractEventRecord, EventSelector};
use rusqlite::{Connection, Row, params};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error};

/// Provides access to cached contract events over a borrowed connection.
#[derive(Debug)]
pub(crate) struct EventProvider<'c> {
    conn: &'c Connection,
}

impl<'c> EventProvider<'c> {
    pub(crate) const fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Inserts events, leaving already cached `(transaction_hash, log_index)`
    /// pairs untouched.
    pub(crate) fn insert(&self, events: &[ContractEventRecord]) -> Result<usize, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO contract_events (transaction_hash, log_index, block_number, \
             transaction_index, contract_address, event_name, event_selector, event_arguments) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(transaction_hash, log_index) DO NOTHING",
        )?;

        let mut inserted = 0;
        for event in events {
            let arguments = JsonValue::Object(event.event_arguments.clone()).to_string();
            inserted += stmt
                .execute(params![
                    codec::hex(&event.transaction_hash),
                    event.log_index,
                    event.block_number,
                    event.transaction_index,
                    codec::hex(&event.contract_address),
                    event.event_name,
                    codec::hex(&event.event_selector),
                    arguments,
                ])
                .inspect_err(|err| {
                    error!(
                        target: "cache",
                        transaction_hash = ?event.transaction_hash,
                        log_index = event.log_index,
                        ?err,
                        "Failed to insert contract event"
                    );
                })?;
        }
        debug!(target: "cache", total = events.len(), inserted, "Stored contract events");
        Ok(inserted)
    }

    /// Gets the cached occurrences of `selector` in `range`, in log order.
    pub(crate) fn get_range(
        &self,
        selector: &EventSelector,
        range: BlockRange,
    ) -> Result<Vec<ContractEventRecord>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT transaction_hash, log_index, block_number, transaction_index, \
             contract_address, event_name, event_selector, event_arguments \
             FROM contract_events \
             WHERE contract_address = ?1 AND event_selector = ?2 \
             AND block_number >= ?3 AND block_number < ?4 \
             ORDER BY block_number, log_index",
        )?;
        let address = codec::hex(&selector.address);
        let key = codec::hex(&selector.key());
        let events = stmt
            .query_map(params![address, key, range.start, range.stop], event_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ContractEventRecord> {
    let arguments: String = row.get(7)?;
    let event_arguments: Map<String, JsonValue> =
        serde_json::from_str(&arguments).map_err(|e| codec::conversion_error(7, e))?;

    Ok(ContractEventRecord {
        transaction_hash: codec::b256(row, 0)?,
        log_index: row.get(1)?,
        block_number: row.get(2)?,
        transaction_index: row.get(3)?,
        contract_address: codec::address(row, 4)?,
        event_name: row.get(5)?,
        event_selector: codec::b256(row, 6)?,
        event_arguments,
    })
}
