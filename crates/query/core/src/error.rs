use crate::FilterError;
use quarry_providers_alloy::ProviderError;
use quarry_storage::StorageError;
use quarry_types::{BlockRange, DecodeError};
use thiserror::Error;

/// An error performing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The range stops before it starts.
    #[error("Invalid range {0}: start is after stop")]
    InvalidRange(BlockRange),
    /// A requested or filtered column does not exist for the queried kind.
    #[error("Unknown column `{0}`")]
    UnknownColumn(String),
    /// The filter expression does not parse.
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),
    /// Fetching from the provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Reading or writing the cache failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A fetched log does not match the event ABI.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type of query operations.
pub type QueryResult<T> = Result<T, QueryError>;
