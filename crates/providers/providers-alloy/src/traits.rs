//! The [`ChainDataProvider`] trait.

use crate::ProviderResult;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use quarry_types::{BlockRange, BlockRecord, EventSelector, RawLog, TransactionRecord};
use std::fmt::Debug;

/// Selects the logs returned by [`ChainDataProvider::logs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogFilter {
    /// The emitting contract.
    pub address: Address,
    /// Topic 0 to match; `None` matches every log of the contract.
    pub topic0: Option<B256>,
}

impl LogFilter {
    /// Creates a new [`LogFilter`].
    pub const fn new(address: Address, topic0: Option<B256>) -> Self {
        Self { address, topic0 }
    }
}

impl From<&EventSelector> for LogFilter {
    fn from(selector: &EventSelector) -> Self {
        Self::new(selector.address, selector.topic0())
    }
}

/// A source of chain data, usually a remote node.
///
/// Every range is half-open. Implementations return records in source order
/// and never skip a block silently: a block the node cannot serve surfaces
/// as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainDataProvider: Debug + Send + Sync {
    /// Returns the chain id of the connected network.
    async fn chain_id(&self) -> ProviderResult<u64>;

    /// Returns the number of the most recent block.
    async fn latest_block_number(&self) -> ProviderResult<u64>;

    /// Returns one [`BlockRecord`] per block in `range`, ascending.
    async fn blocks(&self, range: BlockRange) -> ProviderResult<Vec<BlockRecord>>;

    /// Returns every transaction of the blocks in `range`, ordered by block
    /// and transaction index, with their receipt outcome.
    async fn transactions(&self, range: BlockRange) -> ProviderResult<Vec<TransactionRecord>>;

    /// Returns the logs in `range` matching `filter`, ordered by block and
    /// log index.
    async fn logs(&self, range: BlockRange, filter: LogFilter) -> ProviderResult<Vec<RawLog>>;
}
