//! A context over a fake provider, for command tests.

use quarry_context::{Config, QuarryContext};
use quarry_providers_alloy::{ChainDataProvider, test_utils::FakeChainProvider};
use quarry_registry::{Ecosystem, NetworkConfig, PluginRegistry, ProviderPlugin, RegistryError};
use std::{path::Path, sync::Arc};

/// The chain id reported by the fake provider.
pub(crate) const CHAIN_ID: u64 = 1337;

#[derive(Debug)]
struct FakePlugin(FakeChainProvider);

impl ProviderPlugin for FakePlugin {
    fn name(&self) -> &str {
        "fake"
    }

    fn connect(
        &self,
        _network: &NetworkConfig,
    ) -> Result<Arc<dyn ChainDataProvider>, RegistryError> {
        Ok(Arc::new(self.0.clone()))
    }
}

/// A context on `ethereum:devnet`, served by `provider`, caching under
/// `data_folder`.
pub(crate) fn context(data_folder: &Path, provider: FakeChainProvider) -> QuarryContext {
    let devnet =
        NetworkConfig::new("ethereum", "devnet").with_provider("fake").with_chain_id(CHAIN_ID);
    let registry = PluginRegistry::builder()
        .with_provider(FakePlugin(provider))
        .with_ecosystem(Ecosystem::new("ethereum", "devnet").with_network(devnet))
        .build();
    let config = Config { data_folder: Some(data_folder.to_path_buf()), ..Default::default() };
    QuarryContext::new(config, registry, None).unwrap()
}
