//! The managers held by the [`crate::QuarryContext`].

use crate::ContextResult;
use quarry_providers_alloy::ChainDataProvider;
use quarry_registry::{NetworkConfig, PluginRegistry};
use std::sync::Arc;

/// The registry with the project configuration applied, and the network the
/// process works against.
#[derive(Debug, Clone)]
pub struct NetworkManager {
    registry: PluginRegistry,
    active: NetworkConfig,
}

impl NetworkManager {
    pub(crate) const fn new(registry: PluginRegistry, active: NetworkConfig) -> Self {
        Self { registry, active }
    }

    /// The plugin registry.
    pub const fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// The selected network.
    pub const fn active(&self) -> &NetworkConfig {
        &self.active
    }

    /// Every known network, grouped by ecosystem.
    pub fn networks(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.registry.networks()
    }

    /// Returns `true` if `network` is the selected network.
    pub fn is_active(&self, network: &NetworkConfig) -> bool {
        network.ecosystem == self.active.ecosystem && network.name == self.active.name
    }
}

/// A connection to the selected network's provider.
#[derive(Debug, Clone)]
pub struct ChainManager {
    provider: Arc<dyn ChainDataProvider>,
    chain_id: u64,
}

impl ChainManager {
    pub(crate) fn new(provider: Arc<dyn ChainDataProvider>, chain_id: u64) -> Self {
        Self { provider, chain_id }
    }

    /// The provider.
    pub const fn provider(&self) -> &Arc<dyn ChainDataProvider> {
        &self.provider
    }

    /// The chain id the provider reported when connecting.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The number of the most recent block.
    pub async fn head(&self) -> ContextResult<u64> {
        Ok(self.provider.latest_block_number().await?)
    }
}
