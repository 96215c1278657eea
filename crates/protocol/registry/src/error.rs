use crate::NetworkId;
use thiserror::Error;

/// An error resolving a network or provider from the [`crate::PluginRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The network identifier does not parse.
    #[error("Invalid network `{0}`, expected `ecosystem:network`")]
    InvalidNetworkId(String),
    /// No ecosystem with this name is registered.
    #[error("Unknown ecosystem `{0}`")]
    UnknownEcosystem(String),
    /// The ecosystem has no network with this name.
    #[error("Unknown network `{0}`")]
    UnknownNetwork(NetworkId),
    /// No provider plugin with this name is registered.
    #[error("Unknown provider plugin `{0}`")]
    UnknownProvider(String),
    /// The network has no RPC endpoint configured.
    #[error("No RPC URL configured for network `{0}`")]
    MissingRpcUrl(NetworkId),
}
