//! Configuration and lazily built managers for quarry.
//!
//! A [`QuarryContext`] is created once when the process starts from a
//! [`Config`] and a [`quarry_registry::PluginRegistry`], and handed by
//! reference to whatever needs the network, chain or query managers.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::{ContextError, ContextResult};

mod config;
pub use config::{CONFIG_FILE_NAME, Config, NetworkOverride, QueryConfig};

mod managers;
pub use managers::{ChainManager, NetworkManager};

mod context;
pub use context::{CACHE_FILE_NAME, QuarryContext};
