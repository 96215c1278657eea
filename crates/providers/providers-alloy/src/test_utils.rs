//! A deterministic in-memory [`ChainDataProvider`] for tests.
//!
//! [`FakeChainProvider`] synthesizes blocks and transactions from their
//! numbers, serves logs from a fixed list, and records every fetch so tests
//! can assert exactly which ranges were requested.

use crate::{ChainDataProvider, LogFilter, ProviderError, ProviderResult};
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use async_trait::async_trait;
use quarry_types::{BlockRange, BlockRecord, RawLog, TransactionRecord};
use std::sync::{Arc, Mutex, PoisonError};

/// The ABI of the log produced by [`transfer_log`].
pub const TRANSFER_EVENT: &str =
    "event Transfer(address indexed from, address indexed to, uint256 value)";

/// The fetch method a recorded call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    /// [`ChainDataProvider::blocks`].
    Blocks,
    /// [`ChainDataProvider::transactions`].
    Transactions,
    /// [`ChainDataProvider::logs`].
    Logs,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<(FetchMethod, BlockRange)>,
}

/// A recording fake provider. Clones share their call log.
#[derive(Debug, Clone)]
pub struct FakeChainProvider {
    chain_id: u64,
    head: Option<u64>,
    max_range: Option<u64>,
    unavailable_at: Option<u64>,
    logs: Arc<Vec<RawLog>>,
    state: Arc<Mutex<FakeState>>,
}

impl FakeChainProvider {
    /// Creates a provider for `chain_id` with an unbounded chain.
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            head: None,
            max_range: None,
            unavailable_at: None,
            logs: Arc::default(),
            state: Arc::default(),
        }
    }

    /// Limits the chain to blocks below `head`; later blocks are missing.
    pub const fn with_head(mut self, head: u64) -> Self {
        self.head = Some(head);
        self
    }

    /// Rejects requests spanning more than `max_range` blocks with
    /// [`ProviderError::RangeTooLarge`].
    pub const fn with_max_range(mut self, max_range: u64) -> Self {
        self.max_range = Some(max_range);
        self
    }

    /// Fails every request touching `block` with [`ProviderError::Unavailable`].
    pub const fn with_unavailable_block(mut self, block: u64) -> Self {
        self.unavailable_at = Some(block);
        self
    }

    /// Serves `logs` from [`ChainDataProvider::logs`].
    pub fn with_logs(mut self, logs: Vec<RawLog>) -> Self {
        self.logs = Arc::new(logs);
        self
    }

    /// Returns the ranges of every recorded fetch, in call order.
    pub fn calls(&self) -> Vec<BlockRange> {
        self.recorded().into_iter().map(|(_, range)| range).collect()
    }

    /// Returns the ranges fetched through `method`, in call order.
    pub fn calls_of(&self, method: FetchMethod) -> Vec<BlockRange> {
        self.recorded().into_iter().filter(|(m, _)| *m == method).map(|(_, r)| r).collect()
    }

    /// Forgets every recorded call.
    pub fn reset_calls(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).calls.clear();
    }

    fn recorded(&self) -> Vec<(FetchMethod, BlockRange)> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).calls.clone()
    }

    fn record(&self, method: FetchMethod, range: BlockRange) -> ProviderResult<()> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).calls.push((method, range));

        if self.max_range.is_some_and(|max| range.len() > max) {
            return Err(ProviderError::RangeTooLarge { range });
        }
        if self.unavailable_at.is_some_and(|block| range.contains(block)) {
            return Err(ProviderError::Unavailable("injected failure".to_string()));
        }
        if let Some(head) = self.head {
            if range.stop > head {
                return Err(ProviderError::MissingBlock(head.max(range.start)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChainDataProvider for FakeChainProvider {
    async fn chain_id(&self) -> ProviderResult<u64> {
        Ok(self.chain_id)
    }

    async fn latest_block_number(&self) -> ProviderResult<u64> {
        Ok(self.head.map_or(u64::from(u32::MAX), |head| head.saturating_sub(1)))
    }

    async fn blocks(&self, range: BlockRange) -> ProviderResult<Vec<BlockRecord>> {
        self.record(FetchMethod::Blocks, range)?;
        Ok((range.start..range.stop).map(block).collect())
    }

    async fn transactions(&self, range: BlockRange) -> ProviderResult<Vec<TransactionRecord>> {
        self.record(FetchMethod::Transactions, range)?;
        Ok((range.start..range.stop)
            .flat_map(|number| (0..transaction_count(number)).map(move |i| transaction(number, i)))
            .collect())
    }

    async fn logs(&self, range: BlockRange, filter: LogFilter) -> ProviderResult<Vec<RawLog>> {
        self.record(FetchMethod::Logs, range)?;
        Ok(self
            .logs
            .iter()
            .filter(|log| range.contains(log.block_number) && log.address == filter.address)
            .filter(|log| filter.topic0.is_none_or(|topic| log.topics.first() == Some(&topic)))
            .cloned()
            .collect())
    }
}

/// The block [`FakeChainProvider`] serves for `number`.
pub fn block(number: u64) -> BlockRecord {
    BlockRecord {
        number,
        hash: B256::from(U256::from(number) + U256::from(1)),
        parent_hash: B256::from(U256::from(number)),
        timestamp: 1_600_000_000 + number * 12,
        gas_limit: 30_000_000,
        gas_used: 21_000 * transaction_count(number),
        base_fee_per_gas: Some(1_000_000_000 + number),
        difficulty: U256::ZERO,
        total_difficulty: None,
        size: Some(1_000 + number),
        miner: Address::with_last_byte((number % 4) as u8),
        num_transactions: transaction_count(number),
    }
}

/// The number of transactions [`FakeChainProvider`] puts in block `number`.
pub const fn transaction_count(number: u64) -> u64 {
    number % 3
}

/// The transaction [`FakeChainProvider`] serves at `index` in block `number`.
pub fn transaction(number: u64, index: u64) -> TransactionRecord {
    TransactionRecord {
        hash: keccak256([number.to_be_bytes(), index.to_be_bytes()].concat()),
        block_number: number,
        transaction_index: index,
        sender: Address::with_last_byte(0xaa),
        receiver: (index != 1).then(|| Address::with_last_byte(0xbb)),
        value: U256::from(number * 1_000 + index),
        nonce: number,
        gas_limit: 21_000,
        gas_price: Some(1_000_000_000 + u128::from(number)),
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        gas_used: Some(21_000),
        status: Some(index != 1),
    }
}

/// An ERC-20 style `Transfer` log of `value` emitted by `address`.
pub fn transfer_log(address: Address, block_number: u64, log_index: u64, value: u64) -> RawLog {
    RawLog {
        address,
        topics: vec![
            keccak256("Transfer(address,address,uint256)"),
            Address::with_last_byte(0xaa).into_word(),
            Address::with_last_byte(0xbb).into_word(),
        ],
        data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
        block_number,
        transaction_hash: transaction(block_number, 0).hash,
        transaction_index: 0,
        log_index,
    }
}
