//! Immutable chain records as they are cached and queried.

use crate::Value;
use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A cached row that can be addressed by column name.
///
/// Implementors expose a fixed set of columns in [`Record::COLUMNS`]; records
/// may additionally resolve dynamic columns (decoded event arguments) through
/// [`Record::value`].
pub trait Record {
    /// The fixed columns of this record type, in display order.
    const COLUMNS: &'static [&'static str];

    /// Returns the value of the named column, or `None` if no such column
    /// exists on this record.
    fn value(&self, column: &str) -> Option<Value>;

    /// The block number this record belongs to.
    fn block_number(&self) -> u64;
}

/// A block header, immutable once finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Block number, unique within a network.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Block timestamp in seconds since the unix epoch.
    pub timestamp: u64,
    /// Gas limit of the block.
    pub gas_limit: u64,
    /// Gas used by all transactions in the block.
    pub gas_used: u64,
    /// EIP-1559 base fee, absent before London.
    pub base_fee_per_gas: Option<u64>,
    /// Proof-of-work difficulty; zero after the merge.
    pub difficulty: U256,
    /// Accumulated difficulty, when the node reports it.
    pub total_difficulty: Option<U256>,
    /// Block size in bytes, when the node reports it.
    pub size: Option<u64>,
    /// Fee recipient.
    pub miner: Address,
    /// Number of transactions in the block.
    pub num_transactions: u64,
}

impl Record for BlockRecord {
    const COLUMNS: &'static [&'static str] = &[
        "number",
        "hash",
        "parent_hash",
        "timestamp",
        "gas_limit",
        "gas_used",
        "base_fee_per_gas",
        "difficulty",
        "total_difficulty",
        "size",
        "miner",
        "num_transactions",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "number" => self.number.into(),
            "hash" => self.hash.into(),
            "parent_hash" => self.parent_hash.into(),
            "timestamp" => self.timestamp.into(),
            "gas_limit" => self.gas_limit.into(),
            "gas_used" => self.gas_used.into(),
            "base_fee_per_gas" => self.base_fee_per_gas.into(),
            "difficulty" => self.difficulty.into(),
            "total_difficulty" => self.total_difficulty.into(),
            "size" => self.size.into(),
            "miner" => self.miner.into(),
            "num_transactions" => self.num_transactions.into(),
            _ => return None,
        })
    }

    fn block_number(&self) -> u64 {
        self.number
    }
}

/// A mined transaction together with its receipt outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash, unique across the chain.
    pub hash: B256,
    /// Number of the block containing the transaction.
    pub block_number: u64,
    /// Position of the transaction within its block.
    pub transaction_index: u64,
    /// Sender address.
    pub sender: Address,
    /// Receiver address, `None` for contract creations.
    pub receiver: Option<Address>,
    /// Value transferred, in wei.
    pub value: U256,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit set by the sender.
    pub gas_limit: u64,
    /// Legacy gas price, or the effective gas price for typed transactions.
    pub gas_price: Option<u128>,
    /// EIP-1559 fee cap.
    pub max_fee_per_gas: Option<u128>,
    /// EIP-1559 priority fee cap.
    pub max_priority_fee_per_gas: Option<u128>,
    /// Gas used according to the receipt.
    pub gas_used: Option<u64>,
    /// Receipt status; `true` on success.
    pub status: Option<bool>,
}

impl Record for TransactionRecord {
    const COLUMNS: &'static [&'static str] = &[
        "hash",
        "block_number",
        "transaction_index",
        "sender",
        "receiver",
        "value",
        "nonce",
        "gas_limit",
        "gas_price",
        "max_fee_per_gas",
        "max_priority_fee_per_gas",
        "gas_used",
        "status",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "hash" => self.hash.into(),
            "block_number" => self.block_number.into(),
            "transaction_index" => self.transaction_index.into(),
            "sender" => self.sender.into(),
            "receiver" => self.receiver.into(),
            "value" => self.value.into(),
            "nonce" => self.nonce.into(),
            "gas_limit" => self.gas_limit.into(),
            "gas_price" => self.gas_price.map(U256::from).into(),
            "max_fee_per_gas" => self.max_fee_per_gas.map(U256::from).into(),
            "max_priority_fee_per_gas" => self.max_priority_fee_per_gas.map(U256::from).into(),
            "gas_used" => self.gas_used.into(),
            "status" => self.status.into(),
            _ => return None,
        })
    }

    fn block_number(&self) -> u64 {
        self.block_number
    }
}

/// A decoded contract event occurrence, keyed by `(transaction_hash, log_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEventRecord {
    /// Hash of the transaction that emitted the event.
    pub transaction_hash: B256,
    /// Index of the log within its block.
    pub log_index: u64,
    /// Number of the block containing the log.
    pub block_number: u64,
    /// Index of the emitting transaction within its block.
    pub transaction_index: u64,
    /// Address of the emitting contract.
    pub contract_address: Address,
    /// Event name from the ABI.
    pub event_name: String,
    /// Event selector (topic 0); zero for anonymous events.
    pub event_selector: B256,
    /// Decoded arguments, in ABI order.
    pub event_arguments: serde_json::Map<String, serde_json::Value>,
}

impl Record for ContractEventRecord {
    const COLUMNS: &'static [&'static str] = &[
        "block_number",
        "transaction_hash",
        "transaction_index",
        "log_index",
        "contract_address",
        "event_name",
        "event_selector",
        "event_arguments",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        Some(match column {
            "block_number" => self.block_number.into(),
            "transaction_hash" => self.transaction_hash.into(),
            "transaction_index" => self.transaction_index.into(),
            "log_index" => self.log_index.into(),
            "contract_address" => self.contract_address.into(),
            "event_name" => Value::Text(self.event_name.clone()),
            "event_selector" => self.event_selector.into(),
            "event_arguments" => {
                Value::Json(serde_json::Value::Object(self.event_arguments.clone()))
            }
            argument => Value::Json(self.event_arguments.get(argument)?.clone()),
        })
    }

    fn block_number(&self) -> u64 {
        self.block_number
    }
}

/// A log as returned by the provider, before ABI decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; topic 0 is the event selector for non-anonymous events.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed data.
    pub data: Bytes,
    /// Number of the block containing the log.
    pub block_number: u64,
    /// Hash of the emitting transaction.
    pub transaction_hash: B256,
    /// Index of the emitting transaction within its block.
    pub transaction_index: u64,
    /// Index of the log within its block.
    pub log_index: u64,
}

/// A homogeneous batch of records of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Records {
    /// Block headers.
    Blocks(Vec<BlockRecord>),
    /// Transactions.
    Transactions(Vec<TransactionRecord>),
    /// Decoded contract events.
    ContractEvents(Vec<ContractEventRecord>),
}

impl Records {
    /// Returns the number of records in the batch.
    pub fn len(&self) -> usize {
        match self {
            Self::Blocks(blocks) => blocks.len(),
            Self::Transactions(txs) => txs.len(),
            Self::ContractEvents(events) => events.len(),
        }
    }

    /// Returns `true` if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorts the batch into source order: block number, then the position
    /// within the block.
    pub fn sort(&mut self) {
        match self {
            Self::Blocks(blocks) => blocks.sort_by_key(|b| b.number),
            Self::Transactions(txs) => txs.sort_by_key(|t| (t.block_number, t.transaction_index)),
            Self::ContractEvents(events) => events.sort_by_key(|e| (e.block_number, e.log_index)),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;

    pub(crate) fn block(number: u64) -> BlockRecord {
        BlockRecord {
            number,
            hash: B256::from(U256::from(number + 1)),
            parent_hash: B256::from(U256::from(number)),
            timestamp: 1_700_000_000 + number * 12,
            gas_limit: 30_000_000,
            gas_used: 21_000 * number,
            base_fee_per_gas: Some(7),
            difficulty: U256::ZERO,
            total_difficulty: None,
            size: Some(512),
            miner: Address::repeat_byte(0x11),
            num_transactions: number,
        }
    }
}
