//! Global arguments for the CLI.

use clap::Parser;
use quarry_cli::LogArgs;
use quarry_context::{Config, QuarryContext};
use quarry_registry::{NetworkId, PluginRegistry};
use std::path::PathBuf;

/// Global arguments for the CLI.
#[derive(Parser, Default, Clone, Debug)]
pub struct GlobalArgs {
    /// Logging arguments.
    #[command(flatten)]
    pub log_args: LogArgs,
    /// The network to work against, as `ecosystem:network` or a bare network
    /// name in the default ecosystem.
    #[arg(long, short = 'n', global = true, env = "QUARRY_NETWORK")]
    pub network: Option<NetworkId>,
    /// The folder holding the per-network cache files.
    #[arg(long = "data-folder", global = true, env = "QUARRY_DATA_FOLDER")]
    pub data_folder: Option<PathBuf>,
    /// The project config file. Defaults to `quarry.toml` in the working
    /// directory, if present.
    #[arg(long, global = true, env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,
}

impl GlobalArgs {
    /// Loads the project config and builds the context over `registry`.
    ///
    /// Flags take precedence over the config file.
    pub fn context(&self, registry: PluginRegistry) -> anyhow::Result<QuarryContext> {
        let mut config = Config::discover(self.config.as_deref())?;
        if let Some(data_folder) = &self.data_folder {
            config.data_folder = Some(data_folder.clone());
        }
        Ok(QuarryContext::new(config, registry, self.network.clone())?)
    }
}
