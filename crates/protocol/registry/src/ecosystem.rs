//! Ecosystems: named families of networks.

use crate::NetworkConfig;
use serde::{Deserialize, Serialize};

/// A family of compatible networks sharing encoding rules, such as all
/// EVM chains of the Ethereum ecosystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ecosystem {
    /// The ecosystem name.
    pub name: String,
    /// The network used when a command names none.
    pub default_network: String,
    /// The networks of this ecosystem, in registration order.
    pub networks: Vec<NetworkConfig>,
}

impl Ecosystem {
    /// Creates an ecosystem without networks.
    pub fn new(name: impl Into<String>, default_network: impl Into<String>) -> Self {
        Self { name: name.into(), default_network: default_network.into(), networks: Vec::new() }
    }

    /// Adds `network`, replacing any network with the same name.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.insert(network);
        self
    }

    /// Adds `network`, replacing any network with the same name.
    pub fn insert(&mut self, network: NetworkConfig) {
        match self.networks.iter_mut().find(|n| n.name == network.name) {
            Some(existing) => *existing = network,
            None => self.networks.push(network),
        }
    }

    /// Returns the network named `name`.
    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Returns the network named `name` for modification.
    pub fn network_mut(&mut self, name: &str) -> Option<&mut NetworkConfig> {
        self.networks.iter_mut().find(|n| n.name == name)
    }
}

fn network(name: &str, chain_id: u64, rpc_url: &str) -> NetworkConfig {
    let config = NetworkConfig::new(ETHEREUM_ECOSYSTEM, name).with_chain_id(chain_id);
    match rpc_url.parse() {
        Ok(url) => config.with_rpc_url(url),
        Err(_) => config,
    }
}

/// The name of the built-in Ethereum ecosystem.
pub const ETHEREUM_ECOSYSTEM: &str = "ethereum";

lazy_static::lazy_static! {
    /// The built-in Ethereum ecosystem with its public networks and a local
    /// development node.
    pub static ref ETHEREUM: Ecosystem = Ecosystem::new(ETHEREUM_ECOSYSTEM, "mainnet")
        .with_network(network("mainnet", 1, "https://ethereum-rpc.publicnode.com"))
        .with_network(network("sepolia", 11155111, "https://ethereum-sepolia-rpc.publicnode.com"))
        .with_network(network("holesky", 17000, "https://ethereum-holesky-rpc.publicnode.com"))
        .with_network(network("local", 1337, "http://127.0.0.1:8545"));
}
