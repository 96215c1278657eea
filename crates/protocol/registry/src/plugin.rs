//! Provider plugins and the [`PluginRegistry`].

use crate::{ETHEREUM, Ecosystem, NetworkConfig, NetworkId, RegistryError};
use quarry_providers_alloy::{AlloyChainProvider, ChainDataProvider, PaginatedProvider};
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};
use tracing::debug;

/// The name of the built-in JSON-RPC provider plugin.
pub const NODE_PROVIDER: &str = "node";

/// Connects to networks of a given kind.
///
/// Plugins are registered with the [`PluginRegistry`] at process start and
/// selected per network by name.
pub trait ProviderPlugin: Debug + Send + Sync {
    /// The name networks use to select this plugin.
    fn name(&self) -> &str;

    /// Creates a provider for `network`.
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn ChainDataProvider>, RegistryError>;
}

/// Connects to any Ethereum JSON-RPC node over HTTP, paginating requests by
/// the network's page size.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeProviderPlugin;

impl ProviderPlugin for NodeProviderPlugin {
    fn name(&self) -> &str {
        NODE_PROVIDER
    }

    fn connect(
        &self,
        network: &NetworkConfig,
    ) -> Result<Arc<dyn ChainDataProvider>, RegistryError> {
        let url =
            network.rpc_url.clone().ok_or_else(|| RegistryError::MissingRpcUrl(network.id()))?;
        debug!(target: "registry", network = %network.id(), %url, "Connecting node provider");
        let provider = AlloyChainProvider::new_http(url);
        Ok(Arc::new(PaginatedProvider::new(provider, network.page_size)))
    }
}

/// The ecosystems and provider plugins known to the process.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    providers: BTreeMap<String, Arc<dyn ProviderPlugin>>,
    ecosystems: BTreeMap<String, Ecosystem>,
    default_ecosystem: String,
}

impl PluginRegistry {
    /// Returns a builder for an empty registry.
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::default()
    }

    /// The ecosystem used for network ids without one.
    pub fn default_ecosystem(&self) -> &str {
        &self.default_ecosystem
    }

    /// Iterates over the registered ecosystems, sorted by name.
    pub fn ecosystems(&self) -> impl Iterator<Item = &Ecosystem> {
        self.ecosystems.values()
    }

    /// Returns the ecosystem named `name`.
    pub fn ecosystem(&self, name: &str) -> Result<&Ecosystem, RegistryError> {
        self.ecosystems.get(name).ok_or_else(|| RegistryError::UnknownEcosystem(name.to_string()))
    }

    /// Returns the ecosystem named `name` for modification.
    pub fn ecosystem_mut(&mut self, name: &str) -> Result<&mut Ecosystem, RegistryError> {
        self.ecosystems
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownEcosystem(name.to_string()))
    }

    /// Iterates over every registered network.
    pub fn networks(&self) -> impl Iterator<Item = &NetworkConfig> {
        self.ecosystems.values().flat_map(|e| e.networks.iter())
    }

    /// Resolves a network id, filling in the default ecosystem.
    pub fn network(&self, id: &NetworkId) -> Result<&NetworkConfig, RegistryError> {
        let ecosystem = self.ecosystem(id.ecosystem.as_deref().unwrap_or(&self.default_ecosystem))?;
        ecosystem.network(&id.network).ok_or_else(|| {
            RegistryError::UnknownNetwork(NetworkId::new(&ecosystem.name, &id.network))
        })
    }

    /// The default network of the default ecosystem.
    pub fn default_network(&self) -> Result<&NetworkConfig, RegistryError> {
        let ecosystem = self.ecosystem(&self.default_ecosystem)?;
        self.network(&NetworkId::new(&ecosystem.name, &ecosystem.default_network))
    }

    /// Returns the provider plugin named `name`.
    pub fn provider(&self, name: &str) -> Result<&dyn ProviderPlugin, RegistryError> {
        self.providers
            .get(name)
            .map(|p| p.as_ref())
            .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))
    }

    /// Connects to `network` with its configured provider plugin.
    pub fn connect(
        &self,
        network: &NetworkConfig,
    ) -> Result<Arc<dyn ChainDataProvider>, RegistryError> {
        self.provider(&network.provider)?.connect(network)
    }
}

impl Default for PluginRegistry {
    /// The registry with the built-in `node` provider and the Ethereum
    /// ecosystem.
    fn default() -> Self {
        Self::builder().with_provider(NodeProviderPlugin).with_ecosystem(ETHEREUM.clone()).build()
    }
}

/// Builds a [`PluginRegistry`].
#[derive(Debug, Default)]
pub struct PluginRegistryBuilder {
    providers: BTreeMap<String, Arc<dyn ProviderPlugin>>,
    ecosystems: BTreeMap<String, Ecosystem>,
    default_ecosystem: Option<String>,
}

impl PluginRegistryBuilder {
    /// Registers a provider plugin under its name, replacing any plugin with
    /// the same name.
    pub fn with_provider(mut self, plugin: impl ProviderPlugin + 'static) -> Self {
        self.providers.insert(plugin.name().to_string(), Arc::new(plugin));
        self
    }

    /// Registers an ecosystem, replacing any ecosystem with the same name.
    ///
    /// The first registered ecosystem becomes the default.
    pub fn with_ecosystem(mut self, ecosystem: Ecosystem) -> Self {
        self.default_ecosystem.get_or_insert_with(|| ecosystem.name.clone());
        self.ecosystems.insert(ecosystem.name.clone(), ecosystem);
        self
    }

    /// Builds the registry.
    pub fn build(self) -> PluginRegistry {
        PluginRegistry {
            providers: self.providers,
            ecosystems: self.ecosystems,
            default_ecosystem: self
                .default_ecosystem
                .unwrap_or_else(|| crate::ETHEREUM_ECOSYSTEM.to_string()),
        }
    }
}
