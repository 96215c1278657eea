//! The [`QueryManager`].

use crate::{FilterExpr, QueryError, QueryResult, QueryTable};
use quarry_providers_alloy::{ChainDataProvider, LogFilter};
use quarry_storage::QueryCache;
use quarry_types::{BlockRange, EntityKind, QuerySpec, Record, Records, decode_logs};
use std::sync::Arc;
use tracing::{debug, info};

/// The default number of blocks fetched and stored per cache write.
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;

/// Answers queries from the local cache, fetching what is missing.
///
/// With a cache, every query first computes which parts of its range the
/// cache does not fully hold, fetches those from the provider in ascending
/// order and stores them, then reads the whole range back from the cache.
/// Without a cache, the range is fetched from the provider directly.
///
/// Any fetch failure fails the query; partial results are never returned.
/// Batches stored before the failure stay cached.
#[derive(Debug)]
pub struct QueryManager {
    provider: Arc<dyn ChainDataProvider>,
    cache: Option<Box<dyn QueryCache>>,
    batch_size: u64,
}

impl QueryManager {
    /// Creates a manager that fetches from `provider` and caches in `cache`.
    pub fn new(provider: Arc<dyn ChainDataProvider>, cache: Option<Box<dyn QueryCache>>) -> Self {
        Self { provider, cache, batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Sets how many blocks are fetched and stored per cache write.
    pub const fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    /// The cache backing this manager, if the network has one.
    pub fn cache(&self) -> Option<&dyn QueryCache> {
        self.cache.as_deref()
    }

    /// The provider queries are fetched from.
    pub fn provider(&self) -> &Arc<dyn ChainDataProvider> {
        &self.provider
    }

    /// Runs a query.
    pub async fn perform(&self, spec: &QuerySpec) -> QueryResult<QueryTable> {
        if spec.range.start > spec.range.stop {
            return Err(QueryError::InvalidRange(spec.range));
        }
        let columns = spec.columns.resolve(&spec.kind).map_err(QueryError::UnknownColumn)?;
        let filter = spec.filter.as_deref().map(FilterExpr::parse).transpose()?;
        if let Some(filter) = &filter {
            let available = spec.kind.columns();
            if let Some(unknown) =
                filter.columns().into_iter().find(|c| !available.iter().any(|a| a == c))
            {
                return Err(QueryError::UnknownColumn(unknown.to_string()));
            }
        }

        let mut records = match &self.cache {
            Some(cache) => {
                self.fill_gaps(cache.as_ref(), &spec.kind, spec.range).await?;
                cache.get_range(&spec.kind, spec.range)?
            }
            None => {
                let mut records = self.fetch(&spec.kind, spec.range).await?;
                records.sort();
                records
            }
        };

        let before = records.len();
        match &mut records {
            Records::Blocks(rows) => retain(rows, spec, filter.as_ref()),
            Records::Transactions(rows) => retain(rows, spec, filter.as_ref()),
            Records::ContractEvents(rows) => retain(rows, spec, filter.as_ref()),
        }
        info!(
            target: "query",
            kind = %spec.kind,
            range = %spec.range,
            fetched = before,
            returned = records.len(),
            "Query complete"
        );

        Ok(QueryTable::from_records(&records, columns))
    }

    /// Fetches and stores the parts of `range` the cache does not hold yet.
    ///
    /// Returns the gaps that were filled, in ascending order. Does nothing
    /// without a cache.
    pub async fn sync(
        &self,
        kind: &EntityKind,
        range: BlockRange,
    ) -> QueryResult<Vec<BlockRange>> {
        match &self.cache {
            Some(cache) => self.fill_gaps(cache.as_ref(), kind, range).await,
            None => Ok(Vec::new()),
        }
    }

    async fn fill_gaps(
        &self,
        cache: &dyn QueryCache,
        kind: &EntityKind,
        range: BlockRange,
    ) -> QueryResult<Vec<BlockRange>> {
        let gaps = range.subtract(&cache.contiguous_ranges(kind)?);
        if gaps.is_empty() {
            debug!(target: "query", %kind, %range, "Range fully cached");
            return Ok(gaps);
        }

        for gap in &gaps {
            for batch in gap.chunks(self.batch_size) {
                let records = self.fetch(kind, batch).await?;
                cache.store_fetched(kind, batch, &records)?;
                debug!(target: "query", %kind, %batch, count = records.len(), "Cached batch");
            }
        }
        info!(target: "query", %kind, %range, gaps = gaps.len(), "Filled cache gaps");
        Ok(gaps)
    }

    async fn fetch(&self, kind: &EntityKind, range: BlockRange) -> QueryResult<Records> {
        Ok(match kind {
            EntityKind::Blocks => Records::Blocks(self.provider.blocks(range).await?),
            EntityKind::Transactions => {
                Records::Transactions(self.provider.transactions(range).await?)
            }
            EntityKind::ContractEvents(selector) => {
                let logs = self.provider.logs(range, LogFilter::from(selector)).await?;
                let events = decode_logs(selector, &logs)?;
                if events.len() < logs.len() {
                    debug!(
                        target: "query",
                        event = %selector.event.name,
                        skipped = logs.len() - events.len(),
                        "Skipped logs not matching the anonymous event"
                    );
                }
                Records::ContractEvents(events)
            }
        })
    }
}

fn retain<R: Record>(rows: &mut Vec<R>, spec: &QuerySpec, filter: Option<&FilterExpr>) {
    rows.retain(|row| {
        spec.keeps_block(row.block_number()) && filter.is_none_or(|f| f.matches(row))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_json_abi::Event;
    use alloy_primitives::{Address, Bytes, U256};
    use quarry_providers_alloy::{
        PaginatedProvider, ProviderError,
        test_utils::{FakeChainProvider, FetchMethod, TRANSFER_EVENT, transaction, transfer_log},
    };
    use quarry_storage::{CacheNetwork, SqliteCache};
    use quarry_types::{Columns, EventSelector, RawLog, Value};

    fn cache() -> Box<dyn QueryCache> {
        Box::new(SqliteCache::in_memory(CacheNetwork::new("ethereum:local", 1337)).unwrap())
    }

    fn manager(fake: &FakeChainProvider) -> QueryManager {
        QueryManager::new(Arc::new(fake.clone()), Some(cache()))
    }

    fn ping_log(address: Address, block_number: u64, log_index: u64, id: u64) -> RawLog {
        RawLog {
            address,
            topics: vec![],
            data: Bytes::from(U256::from(id).to_be_bytes::<32>().to_vec()),
            block_number,
            transaction_hash: transaction(block_number, 0).hash,
            transaction_index: 0,
            log_index,
        }
    }

    fn blocks(start: u64, stop: u64) -> QuerySpec {
        QuerySpec::new(EntityKind::Blocks, BlockRange::new(start, stop))
    }

    fn numbers(table: &QueryTable) -> Vec<Value> {
        table.column("number").unwrap().into_iter().cloned().collect()
    }

    fn expected(range: std::ops::Range<u64>) -> Vec<Value> {
        range.map(Value::from).collect()
    }

    #[tokio::test]
    async fn test_empty_cache_fills_requested_range() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);

        let table = manager.perform(&blocks(0, 20)).await.unwrap();
        assert_eq!(numbers(&table), expected(0..20));
        assert_eq!(
            manager.cache().unwrap().contiguous_ranges(&EntityKind::Blocks).unwrap(),
            vec![BlockRange::new(0, 20)]
        );
    }

    #[tokio::test]
    async fn test_repeated_query_is_served_from_cache() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);

        let first = manager.perform(&blocks(5, 15)).await.unwrap();
        fake.reset_calls();
        let second = manager.perform(&blocks(5, 15)).await.unwrap();

        assert_eq!(first, second);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_query_fetches_only_missing_range() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);

        manager.perform(&blocks(0, 20)).await.unwrap();
        fake.reset_calls();
        let table = manager.perform(&blocks(10, 30)).await.unwrap();

        assert_eq!(fake.calls(), vec![BlockRange::new(20, 30)]);
        assert_eq!(numbers(&table), expected(10..30));
        assert_eq!(
            manager.cache().unwrap().contiguous_ranges(&EntityKind::Blocks).unwrap(),
            vec![BlockRange::new(0, 30)]
        );
    }

    #[tokio::test]
    async fn test_query_spanning_cached_island_fetches_both_sides() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);

        manager.perform(&blocks(10, 20)).await.unwrap();
        fake.reset_calls();
        manager.perform(&blocks(0, 30)).await.unwrap();

        assert_eq!(fake.calls(), vec![BlockRange::new(0, 10), BlockRange::new(20, 30)]);
    }

    #[tokio::test]
    async fn test_range_too_large_is_subdivided() {
        let fake = FakeChainProvider::new(1337).with_max_range(128);
        let provider = PaginatedProvider::new(fake.clone(), 1_000);
        let manager = QueryManager::new(Arc::new(provider), Some(cache()));

        let table = manager.perform(&blocks(0, 1_000)).await.unwrap();
        assert_eq!(numbers(&table), expected(0..1_000));
        assert!(fake.calls().iter().skip(1).all(|r| r.len() < 1_000));
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_the_query() {
        let fake = FakeChainProvider::new(1337).with_unavailable_block(25);
        let manager = manager(&fake).with_batch_size(10);

        let err = manager.perform(&blocks(0, 40)).await.unwrap_err();
        assert!(matches!(err, QueryError::Provider(ProviderError::Unavailable(_))));
        // Batches stored before the failure remain cached.
        assert_eq!(
            manager.cache().unwrap().contiguous_ranges(&EntityKind::Blocks).unwrap(),
            vec![BlockRange::new(0, 20)]
        );
    }

    #[tokio::test]
    async fn test_without_cache_fetches_every_time() {
        let fake = FakeChainProvider::new(1337);
        let manager = QueryManager::new(Arc::new(fake.clone()), None);

        manager.perform(&blocks(0, 5)).await.unwrap();
        let table = manager.perform(&blocks(0, 5)).await.unwrap();
        assert_eq!(numbers(&table), expected(0..5));
        assert_eq!(fake.calls().len(), 2);
        assert!(manager.sync(&EntityKind::Blocks, BlockRange::new(0, 5)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transactions_with_empty_blocks_are_not_refetched() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);
        let spec = QuerySpec::new(EntityKind::Transactions, BlockRange::new(0, 6));

        // Blocks 0 and 3 hold no transactions.
        let table = manager.perform(&spec).await.unwrap();
        assert_eq!(table.len(), 6);
        fake.reset_calls();
        assert_eq!(manager.perform(&spec).await.unwrap(), table);
        assert!(fake.calls_of(FetchMethod::Transactions).is_empty());
    }

    #[tokio::test]
    async fn test_step_filter_and_projection() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);
        let spec = blocks(0, 30)
            .with_step(5)
            .with_filter("num_transactions > 0")
            .with_columns(Columns::Named(vec!["number".into(), "gas_used".into()]));

        let table = manager.perform(&spec).await.unwrap();
        assert_eq!(table.columns(), ["number", "gas_used"]);
        // Steps keep 0, 5, 10, 15, 20, 25; the filter drops multiples of three.
        let kept: Vec<Value> = [5u64, 10, 20, 25].into_iter().map(Value::from).collect();
        assert_eq!(numbers(&table), kept);
        // The whole range is cached even though only some rows are returned.
        assert_eq!(
            manager.cache().unwrap().contiguous_ranges(&EntityKind::Blocks).unwrap(),
            vec![BlockRange::new(0, 30)]
        );
    }

    #[tokio::test]
    async fn test_contract_events_are_decoded_and_cached() {
        let token = Address::repeat_byte(0x42);
        let fake = FakeChainProvider::new(1337).with_logs(vec![
            transfer_log(token, 3, 0, 500),
            transfer_log(token, 7, 2, 1_500),
            transfer_log(Address::repeat_byte(0x43), 7, 3, 9),
        ]);
        let manager = manager(&fake);
        let selector = EventSelector::new(token, Event::parse(TRANSFER_EVENT).unwrap());
        let spec = QuerySpec::new(EntityKind::ContractEvents(selector), BlockRange::new(0, 10))
            .with_filter("value > 1000");

        let table = manager.perform(&spec).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("block_number").unwrap(), vec![&Value::from(7u64)]);
        assert_eq!(table.column("value").unwrap(), vec![&Value::Json(serde_json::json!(1500))]);

        fake.reset_calls();
        assert_eq!(manager.perform(&spec).await.unwrap(), table);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_fills_only_gaps() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake).with_batch_size(10);

        manager.perform(&blocks(10, 20)).await.unwrap();
        fake.reset_calls();
        let filled = manager.sync(&EntityKind::Blocks, BlockRange::new(0, 35)).await.unwrap();

        assert_eq!(filled, vec![BlockRange::new(0, 10), BlockRange::new(20, 35)]);
        assert_eq!(
            fake.calls(),
            vec![BlockRange::new(0, 10), BlockRange::new(20, 30), BlockRange::new(30, 35)]
        );
        assert_eq!(
            manager.cache().unwrap().contiguous_ranges(&EntityKind::Blocks).unwrap(),
            vec![BlockRange::new(0, 35)]
        );

        fake.reset_calls();
        let filled = manager.sync(&EntityKind::Blocks, BlockRange::new(5, 30)).await.unwrap();
        assert!(filled.is_empty());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_event_query() {
        let token = Address::repeat_byte(0x42);
        let fake = FakeChainProvider::new(1337).with_logs(vec![
            transfer_log(token, 3, 0, 500),
            ping_log(token, 4, 1, 11),
            ping_log(token, 6, 0, 12),
        ]);
        let manager = manager(&fake);
        let event = Event::parse("event Ping(uint256 id) anonymous").unwrap();
        let selector = EventSelector::new(token, event);
        let spec = QuerySpec::new(EntityKind::ContractEvents(selector), BlockRange::new(0, 10))
            .with_columns(Columns::Named(vec!["block_number".into(), "id".into()]));

        let table = manager.perform(&spec).await.unwrap();
        let ids = [Value::Json(serde_json::json!(11)), Value::Json(serde_json::json!(12))];
        let kept_blocks = [Value::from(4u64), Value::from(6u64)];
        assert_eq!(table.column("block_number").unwrap(), kept_blocks.iter().collect::<Vec<_>>());
        assert_eq!(table.column("id").unwrap(), ids.iter().collect::<Vec<_>>());

        // The regular event on the same contract keeps its own coverage.
        let transfer = EventSelector::new(token, Event::parse(TRANSFER_EVENT).unwrap());
        let transfers = EntityKind::ContractEvents(transfer);
        assert!(manager.cache().unwrap().contiguous_ranges(&transfers).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let fake = FakeChainProvider::new(1337);
        let manager = manager(&fake);

        let err = manager.perform(&blocks(10, 5)).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidRange(_)));

        let spec = blocks(0, 5).with_columns(Columns::Named(vec!["nope".into()]));
        let err = manager.perform(&spec).await.unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn(c) if c == "nope"));

        let spec = blocks(0, 5).with_filter("bogus > 1");
        let err = manager.perform(&spec).await.unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn(c) if c == "bogus"));

        let spec = blocks(0, 5).with_filter("number >");
        assert!(matches!(manager.perform(&spec).await, Err(QueryError::Filter(_))));

        assert!(fake.calls().is_empty());
    }
}
