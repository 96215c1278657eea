//! Contains the quarry CLI.

use crate::{
    commands::{CacheCommand, NetworksCommand, QueryCommand},
    flags::GlobalArgs,
};
use clap::{Parser, Subcommand};
use quarry_cli::{LogConfig, cli_styles};
use quarry_registry::PluginRegistry;

/// Subcommands for the CLI.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Manage the local cache of the selected network.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Query blocks, transactions or contract events.
    #[command(subcommand)]
    Query(QueryCommand),
    /// Inspect the known networks.
    #[command(subcommand)]
    Networks(NetworksCommand),
}

/// The quarry CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub subcommand: Commands,
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
}

impl Cli {
    /// Runs the CLI against the built-in plugin registry.
    pub async fn run(self) -> anyhow::Result<()> {
        LogConfig::new(self.global.log_args.clone()).init_tracing_subscriber(None)?;

        let ctx = self.global.context(PluginRegistry::default())?;
        match self.subcommand {
            Commands::Cache(cmd) => cmd.run(&ctx).await,
            Commands::Query(cmd) => cmd.run(&ctx).await,
            Commands::Networks(cmd) => cmd.run(&ctx),
        }
    }
}
