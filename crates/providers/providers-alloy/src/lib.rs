//! Chain data providers for quarry.
//!
//! [`ChainDataProvider`] is the seam between the query manager and a remote
//! node. [`AlloyChainProvider`] implements it over JSON-RPC, and
//! [`PaginatedProvider`] wraps any provider to bound request sizes and
//! recover from oversized responses.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod errors;
pub use errors::{LIMIT_EXCEEDED_CODE, ProviderError, ProviderResult};

mod traits;
pub use traits::{ChainDataProvider, LogFilter};
#[cfg(test)]
pub use traits::MockChainDataProvider;

mod paginated;
pub use paginated::{DEFAULT_PAGE_SIZE, PaginatedProvider};

mod alloy;
pub use alloy::AlloyChainProvider;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
