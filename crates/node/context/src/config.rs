//! The `quarry.toml` project configuration.

use crate::ContextError;
use quarry_registry::{NetworkConfig, NetworkId, PluginRegistry};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::debug;
use url::Url;

/// The file name looked up in the working directory when no config path is
/// given.
pub const CONFIG_FILE_NAME: &str = "quarry.toml";

/// The project configuration.
///
/// Every field is optional in the file; missing sections take their
/// defaults.
///
/// ```toml
/// data_folder = "/var/lib/quarry"
/// default_network = "ethereum:sepolia"
///
/// [query]
/// page_size = 500
///
/// [networks.ethereum.sepolia]
/// rpc_url = "http://127.0.0.1:8545"
///
/// [networks.ethereum.anvil]
/// rpc_url = "http://127.0.0.1:8546"
/// chain_id = 31337
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where cache files are kept. Defaults to the user data directory.
    pub data_folder: Option<PathBuf>,
    /// The network used when a command names none.
    pub default_network: Option<String>,
    /// Query manager settings.
    pub query: QueryConfig,
    /// Per-network settings, keyed by ecosystem then network name.
    pub networks: BTreeMap<String, BTreeMap<String, NetworkOverride>>,
}

/// Settings of the query manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Blocks per provider request, for networks that do not set their own.
    pub page_size: Option<u64>,
    /// Blocks fetched and stored per cache write.
    pub batch_size: Option<u64>,
}

/// Settings of one network. Unset fields keep the registry's values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkOverride {
    /// The RPC endpoint.
    pub rpc_url: Option<Url>,
    /// The provider plugin name.
    pub provider: Option<String>,
    /// The expected chain id.
    pub chain_id: Option<u64>,
    /// Blocks per provider request.
    pub page_size: Option<u64>,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ContextError::ReadConfig { path: path.to_path_buf(), source })?;
        let config = Self::from_toml(&text)
            .map_err(|source| ContextError::ParseConfig { path: path.to_path_buf(), source })?;
        debug!(target: "context", path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Reads the configuration at `path`, or `quarry.toml` in the working
    /// directory if it exists, or falls back to the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ContextError> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE_NAME).is_file() => {
                Self::load(Path::new(CONFIG_FILE_NAME))
            }
            None => Ok(Self::default()),
        }
    }

    /// Resolves the data folder: the configured one, else `quarry` inside
    /// the user data directory.
    pub fn data_folder(&self) -> Result<PathBuf, ContextError> {
        match &self.data_folder {
            Some(folder) => Ok(folder.clone()),
            None => {
                dirs::data_dir().map(|dir| dir.join("quarry")).ok_or(ContextError::NoDataFolder)
            }
        }
    }

    /// The configured default network, if any.
    pub fn default_network(&self) -> Result<Option<NetworkId>, ContextError> {
        self.default_network.as_deref().map(str::parse::<NetworkId>).transpose().map_err(Into::into)
    }

    /// Applies the query and network settings to `registry`.
    ///
    /// The global page size applies first, then per-network settings.
    /// Networks unknown to the registry are added to their ecosystem; the
    /// ecosystem itself must be registered.
    pub fn apply(&self, registry: &mut PluginRegistry) -> Result<(), ContextError> {
        if let Some(page_size) = self.query.page_size {
            let names: Vec<String> = registry.ecosystems().map(|e| e.name.clone()).collect();
            for name in names {
                for network in &mut registry.ecosystem_mut(&name)?.networks {
                    network.page_size = page_size;
                }
            }
        }

        for (ecosystem_name, networks) in &self.networks {
            let ecosystem = registry.ecosystem_mut(ecosystem_name)?;
            for (name, settings) in networks {
                let mut network = ecosystem.network(name).cloned().unwrap_or_else(|| {
                    let network = NetworkConfig::new(ecosystem_name, name);
                    match self.query.page_size {
                        Some(page_size) => network.with_page_size(page_size),
                        None => network,
                    }
                });
                settings.apply(&mut network);
                ecosystem.insert(network);
            }
        }
        Ok(())
    }
}

impl NetworkOverride {
    fn apply(&self, network: &mut NetworkConfig) {
        if let Some(rpc_url) = &self.rpc_url {
            network.rpc_url = Some(rpc_url.clone());
        }
        if let Some(provider) = &self.provider {
            network.provider = provider.clone();
        }
        if let Some(chain_id) = self.chain_id {
            network.chain_id = Some(chain_id);
        }
        if let Some(page_size) = self.page_size {
            network.page_size = page_size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_registry::NODE_PROVIDER;

    const CONFIG: &str = r#"
        data_folder = "/tmp/quarry"
        default_network = "ethereum:sepolia"

        [query]
        page_size = 250

        [networks.ethereum.sepolia]
        rpc_url = "http://127.0.0.1:8545/"
        page_size = 10

        [networks.ethereum.anvil]
        rpc_url = "http://127.0.0.1:8546/"
        chain_id = 31337
    "#;

    #[test]
    fn test_parse_and_apply() {
        let config = Config::from_toml(CONFIG).unwrap();
        assert_eq!(config.data_folder().unwrap(), PathBuf::from("/tmp/quarry"));
        assert_eq!(config.default_network().unwrap(), Some(NetworkId::new("ethereum", "sepolia")));

        let mut registry = PluginRegistry::default();
        config.apply(&mut registry).unwrap();

        let sepolia = registry.network(&NetworkId::new("ethereum", "sepolia")).unwrap();
        assert_eq!(sepolia.rpc_url.as_ref().unwrap().as_str(), "http://127.0.0.1:8545/");
        assert_eq!(sepolia.page_size, 10);
        assert_eq!(sepolia.chain_id, Some(11155111));

        let anvil = registry.network(&NetworkId::new("ethereum", "anvil")).unwrap();
        assert_eq!(anvil.chain_id, Some(31337));
        assert_eq!(anvil.provider, NODE_PROVIDER);
        assert_eq!(anvil.page_size, 250);

        let mainnet = registry.network(&NetworkId::new("ethereum", "mainnet")).unwrap();
        assert_eq!(mainnet.page_size, 250);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(Config::from_toml("dat_folder = \"/tmp\"").is_err());
    }

    #[test]
    fn test_unknown_ecosystem_is_rejected() {
        let config = Config::from_toml("[networks.solana.mainnet]\nchain_id = 1").unwrap();
        assert!(matches!(
            config.apply(&mut PluginRegistry::default()),
            Err(ContextError::Registry(_))
        ));
    }
}
