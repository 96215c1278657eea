//! SQLite-backed local cache of blocks, transactions and contract events.
//!
//! Each network owns one cache file. The file records the chain id it was
//! created for, and opening it for any other chain fails, so records of
//! different networks are never mixed.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod codec;
mod providers;
mod raw;
mod schema;

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{CacheReader, CacheWriter, QueryCache};

mod sqlite;
pub use sqlite::{CacheNetwork, CacheStats, SqliteCache};

pub use raw::RawQueryResult;

#[cfg(test)]
pub(crate) mod test_utils;
