//! The [`QuarryContext`].

use crate::{ChainManager, Config, ContextError, ContextResult, NetworkManager};
use once_cell::unsync::OnceCell;
use quarry_query::{DEFAULT_BATCH_SIZE, QueryManager};
use quarry_registry::{NetworkConfig, NetworkId, PluginRegistry};
use quarry_storage::{CacheNetwork, QueryCache, SqliteCache};
use std::path::PathBuf;
use tracing::{debug, info};

/// The file name of a network's cache inside its data directory.
pub const CACHE_FILE_NAME: &str = "cache.db";

/// Process-wide state: the configuration, the plugin registry and the
/// managers built from them.
///
/// The context is created once at startup and passed by reference. Managers
/// are built on first access; the chain and query managers connect to the
/// selected network's provider at that point.
#[derive(Debug)]
pub struct QuarryContext {
    config: Config,
    data_folder: PathBuf,
    registry: PluginRegistry,
    network: Option<NetworkId>,
    networks: OnceCell<NetworkManager>,
    chain: tokio::sync::OnceCell<ChainManager>,
    query: tokio::sync::OnceCell<QueryManager>,
}

impl QuarryContext {
    /// Creates a context working against `network`, falling back to the
    /// configured default network and then to the registry's default.
    pub fn new(
        config: Config,
        registry: PluginRegistry,
        network: Option<NetworkId>,
    ) -> ContextResult<Self> {
        let data_folder = config.data_folder()?;
        let network = match network {
            Some(network) => Some(network),
            None => config.default_network()?,
        };
        Ok(Self {
            config,
            data_folder,
            registry,
            network,
            networks: OnceCell::new(),
            chain: tokio::sync::OnceCell::new(),
            query: tokio::sync::OnceCell::new(),
        })
    }

    /// The project configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The folder holding the per-network cache files.
    pub fn data_folder(&self) -> &std::path::Path {
        &self.data_folder
    }

    /// The network manager.
    pub fn networks(&self) -> ContextResult<&NetworkManager> {
        self.networks.get_or_try_init(|| {
            let mut registry = self.registry.clone();
            self.config.apply(&mut registry)?;
            let active = match &self.network {
                Some(id) => registry.network(id)?,
                None => registry.default_network()?,
            }
            .clone();
            debug!(target: "context", network = %active.id(), "Selected network");
            Ok::<_, ContextError>(NetworkManager::new(registry, active))
        })
    }

    /// The selected network.
    pub fn network(&self) -> ContextResult<&NetworkConfig> {
        Ok(self.networks()?.active())
    }

    /// The chain manager. Connects to the provider on first access and
    /// checks its chain id against the network's.
    pub async fn chain(&self) -> ContextResult<&ChainManager> {
        self.chain
            .get_or_try_init(|| async {
                let network = self.network()?;
                let provider = self.networks()?.registry().connect(network)?;
                let chain_id = provider.chain_id().await?;
                if let Some(expected) = network.chain_id.filter(|expected| *expected != chain_id) {
                    return Err(ContextError::ChainIdMismatch {
                        network: network.id(),
                        expected,
                        found: chain_id,
                    });
                }
                info!(target: "context", network = %network.id(), chain_id, "Connected");
                Ok(ChainManager::new(provider, chain_id))
            })
            .await
    }

    /// The query manager. Uses the network's cache when it has been
    /// initialized and fetches everything from the provider otherwise.
    pub async fn query(&self) -> ContextResult<&QueryManager> {
        self.query
            .get_or_try_init(|| async {
                let chain = self.chain().await?;
                let path = self.cache_path()?;
                let cache: Option<Box<dyn QueryCache>> = if path.is_file() {
                    Some(Box::new(SqliteCache::open(&path, chain.chain_id())?))
                } else {
                    info!(
                        target: "context",
                        path = %path.display(),
                        "No cache for this network, queries go to the provider"
                    );
                    None
                };
                let batch_size = self.config.query.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
                Ok::<_, ContextError>(
                    QueryManager::new(chain.provider().clone(), cache).with_batch_size(batch_size),
                )
            })
            .await
    }

    /// The location of the selected network's cache file:
    /// `<data_folder>/<ecosystem>/<network>/cache.db`.
    pub fn cache_path(&self) -> ContextResult<PathBuf> {
        let network = self.network()?;
        Ok(self.data_folder.join(&network.ecosystem).join(&network.name).join(CACHE_FILE_NAME))
    }

    /// Creates the selected network's cache file, identified by the chain id
    /// its provider reports.
    pub async fn init_cache(&self) -> ContextResult<SqliteCache> {
        let chain_id = self.chain().await?.chain_id();
        let network = CacheNetwork::new(self.network()?.id().to_string(), chain_id);
        Ok(SqliteCache::init(&self.cache_path()?, network)?)
    }

    /// Opens the selected network's cache file for inspection. Does not
    /// connect to the provider.
    pub fn open_cache(&self) -> ContextResult<SqliteCache> {
        Ok(SqliteCache::open_read_only(&self.cache_path()?)?)
    }

    /// Deletes the selected network's cache file. Returns `false` if there
    /// was none.
    pub fn purge_cache(&self) -> ContextResult<bool> {
        let path = self.cache_path()?;
        let purged = SqliteCache::purge(&path)?;
        if purged {
            info!(target: "context", path = %path.display(), "Purged cache");
        }
        Ok(purged)
    }
}
