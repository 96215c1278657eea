//! The SQLite cache handle.

use crate::{
    CacheReader, CacheWriter, RawQueryResult, StorageError,
    providers::{
        BlockProvider, EventProvider, FetchedRangeProvider, MetadataProvider, TransactionProvider,
    },
    raw,
    schema::{CREATE_SCHEMA, SCHEMA_VERSION, TABLES},
};
use quarry_types::{BlockRange, EntityKind, Records};
use rusqlite::{Connection, OpenFlags, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CHAIN_ID_KEY: &str = "chain_id";
const NETWORK_KEY: &str = "network";
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Identity of the network a cache file belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNetwork {
    /// Fully qualified network name, `ecosystem:network`.
    pub name: String,
    /// The chain id reported by the network's provider.
    pub chain_id: u64,
}

impl CacheNetwork {
    /// Creates a new [`CacheNetwork`].
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self { name: name.into(), chain_id }
    }
}

/// Row counts of a cache file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached blocks.
    pub blocks: u64,
    /// Number of cached transactions.
    pub transactions: u64,
    /// Number of cached contract events.
    pub contract_events: u64,
    /// Number of recorded fetch ranges.
    pub fetched_ranges: u64,
}

/// A per-network cache of chain data backed by a single SQLite file.
///
/// The handle owns its connection and is meant to be used from one thread;
/// every write runs in its own transaction.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Connection,
    path: Option<PathBuf>,
    network: CacheNetwork,
}

impl SqliteCache {
    /// Creates a new cache file at `path` for `network`.
    ///
    /// Missing parent directories are created. Fails with
    /// [`StorageError::AlreadyInitialized`] if the file exists.
    pub fn init(path: &Path, network: CacheNetwork) -> Result<Self, StorageError> {
        if path.exists() {
            return Err(StorageError::AlreadyInitialized(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        configure(&conn)?;
        let cache = Self::create(conn, Some(path.to_path_buf()), network)?;
        info!(
            target: "cache",
            path = %path.display(),
            network = %cache.network.name,
            chain_id = cache.network.chain_id,
            "Initialized cache"
        );
        Ok(cache)
    }

    /// Opens an existing cache file, checking that it belongs to `chain_id`.
    pub fn open(path: &Path, chain_id: u64) -> Result<Self, StorageError> {
        let cache = Self::open_unchecked(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        if cache.network.chain_id != chain_id {
            warn!(
                target: "cache",
                path = %path.display(),
                expected = chain_id,
                found = cache.network.chain_id,
                "Cache belongs to another chain"
            );
            return Err(StorageError::NetworkMismatch {
                expected: chain_id,
                found: cache.network.chain_id,
            });
        }
        Ok(cache)
    }

    /// Opens an existing cache file without write access, for inspection.
    ///
    /// The schema is verified but the chain id is not checked.
    pub fn open_read_only(path: &Path) -> Result<Self, StorageError> {
        Self::open_unchecked(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
    }

    /// Creates a cache that lives in memory only. Used by tests and dry runs.
    pub fn in_memory(network: CacheNetwork) -> Result<Self, StorageError> {
        Self::create(Connection::open_in_memory()?, None, network)
    }

    fn create(
        conn: Connection,
        path: Option<PathBuf>,
        network: CacheNetwork,
    ) -> Result<Self, StorageError> {
        conn.execute_batch(CREATE_SCHEMA)?;
        {
            let tx = conn.unchecked_transaction()?;
            let metadata = MetadataProvider::new(&tx);
            metadata.set(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_string())?;
            metadata.set(CHAIN_ID_KEY, &network.chain_id.to_string())?;
            metadata.set(NETWORK_KEY, &network.name)?;
            tx.commit()?;
        }
        Ok(Self { conn, path, network })
    }

    fn open_unchecked(path: &Path, flags: OpenFlags) -> Result<Self, StorageError> {
        if !path.is_file() {
            return Err(StorageError::NotInitialized(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        if flags.contains(OpenFlags::SQLITE_OPEN_READ_WRITE) {
            configure(&conn)?;
        }
        let network = verify(&conn)?;
        debug!(
            target: "cache",
            path = %path.display(),
            network = %network.name,
            chain_id = network.chain_id,
            "Opened cache"
        );
        Ok(Self { conn, path: Some(path.to_path_buf()), network })
    }

    /// The network recorded in the cache file.
    pub const fn network(&self) -> &CacheNetwork {
        &self.network
    }

    /// The location of the cache file, `None` for in-memory caches.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Runs a read-only SQL statement and returns its rows.
    ///
    /// Statements that could modify the cache are rejected with
    /// [`StorageError::ReadOnly`] before they run.
    pub fn raw_query(&self, sql: &str) -> Result<RawQueryResult, StorageError> {
        raw::run(&self.conn, sql).inspect_err(|err| {
            debug!(target: "cache", %sql, %err, "Raw query failed");
        })
    }

    /// Returns the number of rows in each cache table.
    pub fn stats(&self) -> Result<CacheStats, StorageError> {
        let count = |table: &str| -> Result<u64, StorageError> {
            Ok(self.conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok(CacheStats {
            blocks: count("blocks")?,
            transactions: count("transactions")?,
            contract_events: count("contract_events")?,
            fetched_ranges: count("fetched_ranges")?,
        })
    }

    /// Deletes the cache file at `path` together with its journal files.
    ///
    /// Returns `false` if there was nothing to delete.
    pub fn purge(path: &Path) -> Result<bool, StorageError> {
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                std::fs::remove_file(sidecar)?;
            }
        }
        info!(target: "cache", path = %path.display(), "Purged cache");
        Ok(true)
    }

    fn put_with(conn: &Connection, records: &Records) -> Result<(), StorageError> {
        match records {
            Records::Blocks(blocks) => BlockProvider::new(conn).insert(blocks)?,
            Records::Transactions(txs) => TransactionProvider::new(conn).insert(txs)?,
            Records::ContractEvents(events) => EventProvider::new(conn).insert(events)?,
        };
        Ok(())
    }
}

impl CacheReader for SqliteCache {
    fn get_range(&self, kind: &EntityKind, range: BlockRange) -> Result<Records, StorageError> {
        Ok(match kind {
            EntityKind::Blocks => Records::Blocks(BlockProvider::new(&self.conn).get_range(range)?),
            EntityKind::Transactions => {
                Records::Transactions(TransactionProvider::new(&self.conn).get_range(range)?)
            }
            EntityKind::ContractEvents(selector) => Records::ContractEvents(
                EventProvider::new(&self.conn).get_range(selector, range)?,
            ),
        })
    }

    fn contiguous_ranges(&self, kind: &EntityKind) -> Result<Vec<BlockRange>, StorageError> {
        match coverage_key(kind) {
            None => BlockProvider::new(&self.conn).contiguous_ranges(),
            Some((kind, scope)) => FetchedRangeProvider::new(&self.conn).ranges(kind, &scope),
        }
    }
}

impl CacheWriter for SqliteCache {
    fn put(&self, records: &Records) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        Self::put_with(&tx, records)?;
        tx.commit()?;
        Ok(())
    }

    fn store_fetched(
        &self,
        kind: &EntityKind,
        range: BlockRange,
        records: &Records,
    ) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        Self::put_with(&tx, records)?;
        if let Some((kind, scope)) = coverage_key(kind) {
            FetchedRangeProvider::new(&tx).record(kind, &scope, range)?;
        }
        tx.commit()?;
        debug!(target: "cache", %kind, %range, records = records.len(), "Stored fetched range");
        Ok(())
    }
}

/// The `fetched_ranges` key of kinds whose coverage is tracked explicitly.
///
/// Blocks have exactly one row per number, so their coverage is read from
/// the rows and they have no key.
fn coverage_key(kind: &EntityKind) -> Option<(&'static str, String)> {
    match kind {
        EntityKind::Blocks => None,
        EntityKind::Transactions => Some(("transactions", String::new())),
        EntityKind::ContractEvents(selector) => Some(("contract_events", selector.scope())),
    }
}

fn configure(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    Ok(())
}

/// Checks that every table exists and the schema version matches, and
/// returns the recorded network.
fn verify(conn: &Connection) -> Result<CacheNetwork, StorageError> {
    for table in TABLES {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::CacheCorruption(format!("missing table `{table}`")));
        }
    }

    let metadata = MetadataProvider::new(conn);
    let version = metadata.require(SCHEMA_VERSION_KEY)?;
    if version != SCHEMA_VERSION.to_string() {
        return Err(StorageError::CacheCorruption(format!(
            "unsupported schema version {version}, expected {SCHEMA_VERSION}"
        )));
    }
    let chain_id = metadata.require(CHAIN_ID_KEY)?;
    let chain_id = chain_id
        .parse()
        .map_err(|_| StorageError::CacheCorruption(format!("invalid chain id `{chain_id}`")))?;
    let name = metadata.require(NETWORK_KEY)?;
    Ok(CacheNetwork { name, chain_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{block, transaction, transfer, transfer_selector};
    use alloy_json_abi::Event;
    use quarry_types::EventSelector;
    use rstest::rstest;
    use tempfile::TempDir;

    fn mainnet() -> CacheNetwork {
        CacheNetwork::new("ethereum:mainnet", 1)
    }

    fn blocks(numbers: impl IntoIterator<Item = u64>) -> Records {
        Records::Blocks(numbers.into_iter().map(block).collect())
    }

    #[test]
    fn test_init_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ethereum").join("mainnet").join("cache.db");

        let cache = SqliteCache::init(&path, mainnet()).unwrap();
        cache.put(&blocks(0..3)).unwrap();
        drop(cache);

        let cache = SqliteCache::open(&path, 1).unwrap();
        assert_eq!(cache.network(), &mainnet());
        assert_eq!(cache.path(), Some(path.as_path()));
        assert_eq!(cache.stats().unwrap().blocks, 3);
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        SqliteCache::init(&path, mainnet()).unwrap();
        assert!(matches!(
            SqliteCache::init(&path, mainnet()),
            Err(StorageError::AlreadyInitialized(p)) if p == path
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        assert!(matches!(SqliteCache::open(&path, 1), Err(StorageError::NotInitialized(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_other_chain_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        SqliteCache::init(&path, mainnet()).unwrap();
        assert!(matches!(
            SqliteCache::open(&path, 11155111),
            Err(StorageError::NetworkMismatch { expected: 11155111, found: 1 })
        ));
    }

    #[test]
    fn test_open_garbage_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        std::fs::write(&path, vec![0xab; 4096]).unwrap();
        assert!(matches!(SqliteCache::open(&path, 1), Err(StorageError::CacheCorruption(_))));
    }

    #[test]
    fn test_open_missing_table_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        SqliteCache::init(&path, mainnet()).unwrap();
        Connection::open(&path).unwrap().execute_batch("DROP TABLE fetched_ranges").unwrap();
        assert!(matches!(SqliteCache::open(&path, 1), Err(StorageError::CacheCorruption(_))));
    }

    #[test]
    fn test_undecodable_row_is_corruption() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&blocks([5])).unwrap();
        cache.conn.execute("UPDATE blocks SET hash = 'zz' WHERE number = 5", []).unwrap();
        assert!(matches!(
            cache.get_range(&EntityKind::Blocks, BlockRange::new(0, 10)),
            Err(StorageError::CacheCorruption(_))
        ));
    }

    #[test]
    fn test_put_is_idempotent() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&blocks([1, 2])).unwrap();

        let mut altered = block(1);
        altered.gas_used = 1;
        cache.put(&Records::Blocks(vec![altered])).unwrap();
        cache.put(&blocks([1])).unwrap();

        let cached = cache.get_range(&EntityKind::Blocks, BlockRange::new(0, 10)).unwrap();
        assert_eq!(cached, blocks([1, 2]));
        assert_eq!(cache.stats().unwrap().blocks, 2);
    }

    #[rstest]
    #[case::empty(&[], &[])]
    #[case::single_run(&[0, 1, 2, 3], &[(0, 4)])]
    #[case::one_missing_block(&[0, 1, 3, 4], &[(0, 2), (3, 5)])]
    #[case::isolated(&[7], &[(7, 8)])]
    #[case::many_runs(&[1, 2, 5, 9, 10, 11], &[(1, 3), (5, 6), (9, 12)])]
    fn test_block_contiguous_ranges(#[case] numbers: &[u64], #[case] expected: &[(u64, u64)]) {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&blocks(numbers.iter().copied())).unwrap();
        let expected: Vec<_> = expected.iter().map(|&(s, e)| BlockRange::new(s, e)).collect();
        assert_eq!(cache.contiguous_ranges(&EntityKind::Blocks).unwrap(), expected);
    }

    #[test]
    fn test_block_range_is_half_open_and_ordered() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&blocks([9, 3, 5, 4, 10])).unwrap();
        let cached = cache.get_range(&EntityKind::Blocks, BlockRange::new(4, 10)).unwrap();
        assert_eq!(cached, blocks([4, 5, 9]));
    }

    #[test]
    fn test_transactions_track_fetched_ranges() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        let kind = EntityKind::Transactions;

        // Block 2 has no transactions; the range must still count as fetched.
        let txs =
            Records::Transactions(vec![transaction(1, 1), transaction(1, 0), transaction(3, 0)]);
        let none = Records::Transactions(vec![]);
        cache.store_fetched(&kind, BlockRange::new(0, 4), &txs).unwrap();
        cache.store_fetched(&kind, BlockRange::new(4, 8), &none).unwrap();
        cache.store_fetched(&kind, BlockRange::new(10, 12), &none).unwrap();

        assert_eq!(
            cache.contiguous_ranges(&kind).unwrap(),
            vec![BlockRange::new(0, 8), BlockRange::new(10, 12)]
        );
        assert_eq!(cache.stats().unwrap().fetched_ranges, 2);

        let Records::Transactions(cached) = cache.get_range(&kind, BlockRange::new(0, 8)).unwrap()
        else {
            panic!("expected transactions");
        };
        assert_eq!(cached, vec![transaction(1, 0), transaction(1, 1), transaction(3, 0)]);
    }

    #[test]
    fn test_put_does_not_mark_coverage() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&Records::Transactions(vec![transaction(1, 0)])).unwrap();
        assert!(cache.contiguous_ranges(&EntityKind::Transactions).unwrap().is_empty());
    }

    #[test]
    fn test_events_are_scoped_by_selector() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        let selector = transfer_selector();
        let kind = EntityKind::ContractEvents(selector.clone());
        let events =
            Records::ContractEvents(vec![transfer(&selector, 2, 0), transfer(&selector, 2, 1)]);
        cache.store_fetched(&kind, BlockRange::new(0, 5), &events).unwrap();

        assert_eq!(cache.get_range(&kind, BlockRange::new(0, 5)).unwrap(), events);
        assert_eq!(cache.contiguous_ranges(&kind).unwrap(), vec![BlockRange::new(0, 5)]);

        let mut other = transfer_selector();
        other.address = alloy_primitives::Address::repeat_byte(0x43);
        let other = EntityKind::ContractEvents(other);
        assert!(cache.contiguous_ranges(&other).unwrap().is_empty());
        assert!(cache.get_range(&other, BlockRange::new(0, 5)).unwrap().is_empty());
    }

    #[test]
    fn test_anonymous_events_do_not_share_rows() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        let address = alloy_primitives::Address::repeat_byte(0x42);
        let ping = Event::parse("event Ping(uint256 id) anonymous").unwrap();
        let pong = Event::parse("event Pong(uint256 id) anonymous").unwrap();
        let ping = EventSelector::new(address, ping);
        let pong = EventSelector::new(address, pong);
        let ping_kind = EntityKind::ContractEvents(ping.clone());
        let pong_kind = EntityKind::ContractEvents(pong.clone());

        let pings = Records::ContractEvents(vec![transfer(&ping, 1, 0)]);
        let pongs = Records::ContractEvents(vec![transfer(&pong, 1, 1), transfer(&pong, 3, 0)]);
        cache.store_fetched(&ping_kind, BlockRange::new(0, 2), &pings).unwrap();
        cache.store_fetched(&pong_kind, BlockRange::new(0, 4), &pongs).unwrap();

        assert_eq!(cache.contiguous_ranges(&ping_kind).unwrap(), vec![BlockRange::new(0, 2)]);
        assert_eq!(cache.contiguous_ranges(&pong_kind).unwrap(), vec![BlockRange::new(0, 4)]);
        assert_eq!(cache.get_range(&ping_kind, BlockRange::new(0, 4)).unwrap(), pings);
        assert_eq!(cache.get_range(&pong_kind, BlockRange::new(0, 4)).unwrap(), pongs);
    }

    #[test]
    fn test_raw_query() {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&blocks(0..4)).unwrap();

        let result = cache
            .raw_query("SELECT number, miner FROM blocks WHERE number >= 2 ORDER BY number")
            .unwrap();
        assert_eq!(result.columns, vec!["number", "miner"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][0], quarry_types::Value::Int(2));
    }

    #[rstest]
    #[case("DELETE FROM blocks")]
    #[case("INSERT INTO metadata (key, value) VALUES ('a', 'b')")]
    #[case("DROP TABLE blocks")]
    fn test_raw_query_rejects_writes(#[case] sql: &str) {
        let cache = SqliteCache::in_memory(mainnet()).unwrap();
        cache.put(&blocks(0..2)).unwrap();
        assert!(matches!(cache.raw_query(sql), Err(StorageError::ReadOnly)));
        assert_eq!(cache.stats().unwrap().blocks, 2);
    }

    #[test]
    fn test_purge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        SqliteCache::init(&path, mainnet()).unwrap();
        assert!(SqliteCache::purge(&path).unwrap());
        assert!(!path.exists());
        assert!(!SqliteCache::purge(&path).unwrap());
    }
}
