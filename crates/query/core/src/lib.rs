//! The quarry query manager.
//!
//! [`QueryManager`] answers a [`quarry_types::QuerySpec`] by filling the gaps
//! of the local cache from a chain data provider and then reading the whole
//! range back from the cache.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::{QueryError, QueryResult};

mod filter;
pub use filter::{CmpOp, FilterError, FilterExpr};

mod table;
pub use table::QueryTable;

mod manager;
pub use manager::{DEFAULT_BATCH_SIZE, QueryManager};
