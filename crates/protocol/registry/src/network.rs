//! Network identifiers and configurations.

use crate::RegistryError;
use quarry_providers_alloy::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use url::Url;

/// Identifies a network as `ecosystem:network`.
///
/// The ecosystem may be omitted, in which case the registry's default
/// ecosystem is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId {
    /// The ecosystem name, if given.
    pub ecosystem: Option<String>,
    /// The network name within the ecosystem.
    pub network: String,
}

impl NetworkId {
    /// Creates a fully qualified [`NetworkId`].
    pub fn new(ecosystem: impl Into<String>, network: impl Into<String>) -> Self {
        Self { ecosystem: Some(ecosystem.into()), network: network.into() }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ecosystem {
            Some(ecosystem) => write!(f, "{ecosystem}:{}", self.network),
            None => f.write_str(&self.network),
        }
    }
}

impl FromStr for NetworkId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidNetworkId(s.to_string());
        let valid = |part: &str| {
            !part.is_empty()
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };

        match s.trim().split_once(':') {
            Some((ecosystem, network)) if valid(ecosystem) && valid(network) => {
                Ok(Self::new(ecosystem.to_lowercase(), network.to_lowercase()))
            }
            Some(_) => Err(invalid()),
            None if valid(s.trim()) => {
                Ok(Self { ecosystem: None, network: s.trim().to_lowercase() })
            }
            None => Err(invalid()),
        }
    }
}

/// How to reach one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The ecosystem the network belongs to.
    pub ecosystem: String,
    /// The network name, unique within the ecosystem.
    pub name: String,
    /// The expected chain id, when known in advance.
    pub chain_id: Option<u64>,
    /// The name of the provider plugin used to connect.
    pub provider: String,
    /// The RPC endpoint handed to the provider plugin.
    pub rpc_url: Option<Url>,
    /// The maximum number of blocks requested from the provider at once.
    pub page_size: u64,
}

impl NetworkConfig {
    /// Creates a network served by the `node` provider plugin.
    pub fn new(ecosystem: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            name: name.into(),
            chain_id: None,
            provider: crate::NODE_PROVIDER.to_string(),
            rpc_url: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the expected chain id.
    pub const fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Sets the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: Url) -> Self {
        self.rpc_url = Some(rpc_url);
        self
    }

    /// Sets the provider plugin.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Sets the page size.
    pub const fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// The fully qualified identifier of this network.
    pub fn id(&self) -> NetworkId {
        NetworkId::new(&self.ecosystem, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ethereum:mainnet", Some("ethereum"), "mainnet")]
    #[case("Ethereum:Sepolia", Some("ethereum"), "sepolia")]
    #[case(" sepolia ", None, "sepolia")]
    #[case("ethereum:my_fork-2", Some("ethereum"), "my_fork-2")]
    fn test_parse_network_id(
        #[case] input: &str,
        #[case] ecosystem: Option<&str>,
        #[case] network: &str,
    ) {
        let id: NetworkId = input.parse().unwrap();
        assert_eq!(id.ecosystem.as_deref(), ecosystem);
        assert_eq!(id.network, network);
    }

    #[rstest]
    #[case("")]
    #[case(":mainnet")]
    #[case("ethereum:")]
    #[case("ethereum:main:net")]
    #[case("ethereum/mainnet")]
    fn test_invalid_network_id(#[case] input: &str) {
        assert!(matches!(input.parse::<NetworkId>(), Err(RegistryError::InvalidNetworkId(_))));
    }

    #[test]
    fn test_display_round_trips() {
        let id = NetworkId::new("ethereum", "holesky");
        assert_eq!(id.to_string(), "ethereum:holesky");
        assert_eq!(id.to_string().parse::<NetworkId>().unwrap(), id);
    }
}
