//! Networks Subcommand

use clap::Subcommand;
use quarry_context::{NetworkManager, QuarryContext};
use tabled::{
    Table,
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

/// The `networks` Subcommand
///
/// # Usage
///
/// ```sh
/// quarry networks list
/// ```
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
#[command(about = "Inspect the known networks")]
pub enum NetworksCommand {
    /// Lists every network of every ecosystem. The selected network is
    /// marked with `*`.
    List,
}

impl NetworksCommand {
    /// Runs the subcommand.
    pub fn run(self, ctx: &QuarryContext) -> anyhow::Result<()> {
        match self {
            Self::List => println!("{}", networks_table(ctx.networks()?)),
        }
        Ok(())
    }
}

pub(crate) fn networks_table(networks: &NetworkManager) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["", "network", "chain id", "provider", "page size", "rpc url"]);
    for network in networks.networks() {
        builder.push_record([
            if networks.is_active(network) { "*" } else { "" }.to_string(),
            network.id().to_string(),
            network.chain_id.map(|id| id.to_string()).unwrap_or_default(),
            network.provider.clone(),
            network.page_size.to_string(),
            network.rpc_url.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::modern());
    table.modify(Columns::one(2), Alignment::right());
    table
}
