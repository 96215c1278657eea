//! Errors raised while building the [`crate::QuarryContext`].

use quarry_providers_alloy::ProviderError;
use quarry_registry::{NetworkId, RegistryError};
use quarry_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// An error building or using the context.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        /// The config file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid.
    #[error("invalid config {path}: {source}")]
    ParseConfig {
        /// The config file.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// No data folder is configured and the platform has no user data
    /// directory.
    #[error("no data folder configured and no user data directory found")]
    NoDataFolder,
    /// The provider reports a different chain than the network expects.
    #[error("network {network} expects chain id {expected}, provider reports {found}")]
    ChainIdMismatch {
        /// The network.
        network: NetworkId,
        /// The configured chain id.
        expected: u64,
        /// The chain id reported by the provider.
        found: u64,
    },
    /// A registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// A cache operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A [`Result`] with a [`ContextError`].
pub type ContextResult<T> = Result<T, ContextError>;
