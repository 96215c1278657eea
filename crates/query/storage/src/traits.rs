use crate::StorageError;
use quarry_types::{BlockRange, EntityKind, Records};
use std::fmt::Debug;

/// Read access to cached chain data.
///
/// Implementations only ever return records that were fully written; a range
/// reported by [`CacheReader::contiguous_ranges`] can be served without
/// contacting a provider.
pub trait CacheReader {
    /// Gets every cached record of `kind` whose block number lies in `range`.
    ///
    /// Records are returned in source order: block number first, then the
    /// position of the record within its block.
    ///
    /// # Returns
    /// * `Ok(Records)` with the cached records, possibly empty.
    /// * `Err(StorageError)` if the cache could not be read.
    fn get_range(&self, kind: &EntityKind, range: BlockRange) -> Result<Records, StorageError>;

    /// Gets the maximal runs of blocks for which `kind` is fully cached.
    ///
    /// The returned ranges are sorted, disjoint and non-adjacent.
    fn contiguous_ranges(&self, kind: &EntityKind) -> Result<Vec<BlockRange>, StorageError>;
}

/// Write access to cached chain data.
pub trait CacheWriter {
    /// Saves `records` to the cache.
    ///
    /// Inserting a record that is already cached is a no-op; the first stored
    /// copy wins.
    ///
    /// # Returns
    /// * `Ok(())` once every record is durable.
    /// * `Err(StorageError)` if the write failed. Nothing is written in that case.
    fn put(&self, records: &Records) -> Result<(), StorageError>;

    /// Saves the records fetched for `range` and marks `range` as covered for
    /// `kind`, in a single transaction.
    ///
    /// `records` must hold everything the provider returned for `range`; an
    /// empty batch records that the range holds no data of this kind.
    fn store_fetched(
        &self,
        kind: &EntityKind,
        range: BlockRange,
        records: &Records,
    ) -> Result<(), StorageError>;
}

/// A cache that can both serve and store query results.
pub trait QueryCache: CacheReader + CacheWriter + Debug {}

impl<T: CacheReader + CacheWriter + Debug> QueryCache for T {}
