//! Ecosystems, networks and provider plugins known to quarry.
//!
//! Plugins are registered explicitly when the process starts; the
//! [`PluginRegistry::default`] registry carries the built-in `node` provider
//! and the [`ETHEREUM`] ecosystem.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::RegistryError;

mod network;
pub use network::{NetworkConfig, NetworkId};

mod ecosystem;
pub use ecosystem::{ETHEREUM, ETHEREUM_ECOSYSTEM, Ecosystem};

mod plugin;
pub use plugin::{
    NODE_PROVIDER, NodeProviderPlugin, PluginRegistry, PluginRegistryBuilder, ProviderPlugin,
};
