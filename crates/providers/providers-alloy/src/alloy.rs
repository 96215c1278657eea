//! A [`ChainDataProvider`] backed by an alloy [`RootProvider`].

use crate::{ChainDataProvider, LogFilter, ProviderError, ProviderResult};
use alloy_consensus::Transaction as _;
use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_network::ReceiptResponse;
use alloy_primitives::B256;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Block, Filter, Log, Transaction, TransactionReceipt};
use async_trait::async_trait;
use quarry_types::{BlockRange, BlockRecord, RawLog, TransactionRecord};
use std::collections::HashMap;
use tracing::{debug, trace};
use url::Url;

/// A JSON-RPC chain data provider.
///
/// Blocks are fetched one at a time with `eth_getBlockByNumber`; transactions
/// additionally pull the block's receipts with `eth_getBlockReceipts` to fill
/// in gas used and status. Logs are fetched with a single `eth_getLogs` call
/// per range, so callers are expected to bound ranges with a
/// [`crate::PaginatedProvider`].
#[derive(Debug, Clone)]
pub struct AlloyChainProvider {
    inner: RootProvider,
}

impl AlloyChainProvider {
    /// Creates a new [`AlloyChainProvider`] over the given provider.
    pub const fn new(inner: RootProvider) -> Self {
        Self { inner }
    }

    /// Creates a new [`AlloyChainProvider`] talking HTTP to `url`.
    pub fn new_http(url: Url) -> Self {
        Self::new(RootProvider::new_http(url))
    }

    async fn block(&self, number: u64, full: bool) -> ProviderResult<Block> {
        let request = self.inner.get_block_by_number(BlockNumberOrTag::Number(number));
        let request = if full { request.full() } else { request.hashes() };
        request
            .await
            .map_err(|err| ProviderError::from_rpc(err, BlockRange::new(number, number + 1)))?
            .ok_or(ProviderError::MissingBlock(number))
    }

    async fn receipts(&self, number: u64) -> ProviderResult<Vec<TransactionReceipt>> {
        self.inner
            .get_block_receipts(BlockId::number(number))
            .await
            .map_err(|err| ProviderError::from_rpc(err, BlockRange::new(number, number + 1)))?
            .ok_or(ProviderError::MissingBlock(number))
    }
}

#[async_trait]
impl ChainDataProvider for AlloyChainProvider {
    async fn chain_id(&self) -> ProviderResult<u64> {
        self.inner
            .get_chain_id()
            .await
            .map_err(|err| ProviderError::from_rpc(err, BlockRange::default()))
    }

    async fn latest_block_number(&self) -> ProviderResult<u64> {
        self.inner
            .get_block_number()
            .await
            .map_err(|err| ProviderError::from_rpc(err, BlockRange::default()))
    }

    async fn blocks(&self, range: BlockRange) -> ProviderResult<Vec<BlockRecord>> {
        let mut blocks = Vec::with_capacity(range.len() as usize);
        for number in range.start..range.stop {
            blocks.push(block_record(&self.block(number, false).await?));
        }
        debug!(target: "provider", %range, "Fetched blocks");
        Ok(blocks)
    }

    async fn transactions(&self, range: BlockRange) -> ProviderResult<Vec<TransactionRecord>> {
        let mut records = Vec::new();
        for number in range.start..range.stop {
            let block = self.block(number, true).await?;
            if block.transactions.is_empty() {
                continue;
            }
            let Some(transactions) = block.transactions.as_transactions() else {
                return Err(ProviderError::Rpc(format!(
                    "node returned transaction hashes instead of bodies for block {number}"
                )));
            };

            let outcomes: HashMap<B256, (bool, u64)> = self
                .receipts(number)
                .await?
                .iter()
                .map(|r| (r.transaction_hash(), (r.status(), r.gas_used())))
                .collect();
            let count = transactions.len();
            trace!(target: "provider", number, count, "Fetched block transactions");

            records.extend(transactions.iter().map(|tx| transaction_record(number, tx, &outcomes)));
        }
        debug!(target: "provider", %range, count = records.len(), "Fetched transactions");
        Ok(records)
    }

    async fn logs(&self, range: BlockRange, filter: LogFilter) -> ProviderResult<Vec<RawLog>> {
        let Some(last) = range.last() else {
            return Ok(Vec::new());
        };
        let mut rpc_filter =
            Filter::new().from_block(range.start).to_block(last).address(filter.address);
        if let Some(topic0) = filter.topic0 {
            rpc_filter = rpc_filter.event_signature(topic0);
        }

        let logs = self
            .inner
            .get_logs(&rpc_filter)
            .await
            .map_err(|err| ProviderError::from_rpc(err, range))?;
        debug!(target: "provider", %range, count = logs.len(), "Fetched logs");

        let mut raw = logs.iter().map(raw_log).collect::<ProviderResult<Vec<_>>>()?;
        raw.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(raw)
    }
}

fn block_record(block: &Block) -> BlockRecord {
    let header = &block.header;
    BlockRecord {
        number: header.number,
        hash: header.hash,
        parent_hash: header.parent_hash,
        timestamp: header.timestamp,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        base_fee_per_gas: header.base_fee_per_gas,
        difficulty: header.difficulty,
        total_difficulty: header.total_difficulty,
        size: header.size.and_then(|size| u64::try_from(size).ok()),
        miner: header.beneficiary,
        num_transactions: block.transactions.len() as u64,
    }
}

fn transaction_record(
    number: u64,
    tx: &Transaction,
    outcomes: &HashMap<B256, (bool, u64)>,
) -> TransactionRecord {
    let hash = *tx.inner.tx_hash();
    let outcome = outcomes.get(&hash);
    TransactionRecord {
        hash,
        block_number: tx.block_number.unwrap_or(number),
        transaction_index: tx.transaction_index.unwrap_or_default(),
        sender: tx.inner.signer(),
        receiver: tx.to(),
        value: tx.value(),
        nonce: tx.nonce(),
        gas_limit: tx.gas_limit(),
        gas_price: tx.effective_gas_price.or_else(|| tx.gas_price()),
        max_fee_per_gas: tx.is_dynamic_fee().then(|| tx.max_fee_per_gas()),
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas(),
        gas_used: outcome.map(|(_, gas_used)| *gas_used),
        status: outcome.map(|(status, _)| *status),
    }
}

fn raw_log(log: &Log) -> ProviderResult<RawLog> {
    let (Some(block_number), Some(transaction_hash), Some(transaction_index), Some(log_index)) =
        (log.block_number, log.transaction_hash, log.transaction_index, log.log_index)
    else {
        return Err(ProviderError::Rpc("node returned a log without its block position".into()));
    };
    Ok(RawLog {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number,
        transaction_hash,
        transaction_index,
        log_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U64};
    use alloy_rpc_client::RpcClient;
    use alloy_transport::mock::{Asserter, MockTransport};

    fn mocked() -> (AlloyChainProvider, Asserter) {
        let asserter = Asserter::new();
        let transport = MockTransport::new(asserter.clone());
        let client = RpcClient::new(transport, false);
        (AlloyChainProvider::new(RootProvider::new(client)), asserter)
    }

    #[tokio::test]
    async fn test_chain_id() {
        let (provider, asserter) = mocked();
        asserter.push_success(&U64::from(11155111));
        assert_eq!(provider.chain_id().await.unwrap(), 11155111);
    }

    #[tokio::test]
    async fn test_missing_block() {
        let (provider, asserter) = mocked();
        asserter.push_success(&Option::<Block>::None);
        assert_eq!(
            provider.blocks(BlockRange::new(42, 43)).await.unwrap_err(),
            ProviderError::MissingBlock(42)
        );
    }

    #[tokio::test]
    async fn test_blocks_are_converted() {
        let (provider, asserter) = mocked();
        let mut block = Block::<Transaction>::default();
        block.header.inner.number = 7;
        block.header.hash = B256::repeat_byte(7);
        block.header.inner.gas_limit = 30_000_000;
        block.header.inner.beneficiary = Address::repeat_byte(1);
        asserter.push_success(&block);

        let blocks = provider.blocks(BlockRange::new(7, 8)).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].number, 7);
        assert_eq!(blocks[0].hash, B256::repeat_byte(7));
        assert_eq!(blocks[0].miner, Address::repeat_byte(1));
        assert_eq!(blocks[0].num_transactions, 0);
    }

    #[tokio::test]
    async fn test_limit_error_is_range_too_large() {
        let (provider, asserter) = mocked();
        asserter.push_failure_msg("query returned more than 10000 results");
        let range = BlockRange::new(0, 5000);
        assert_eq!(
            provider.logs(range, LogFilter::new(Address::ZERO, None)).await.unwrap_err(),
            ProviderError::RangeTooLarge { range }
        );
    }

    #[tokio::test]
    async fn test_empty_log_range_makes_no_request() {
        let (provider, _asserter) = mocked();
        let logs = provider.logs(BlockRange::new(3, 3), LogFilter::new(Address::ZERO, None));
        assert!(logs.await.unwrap().is_empty());
    }
}
