//! Cache Subcommand

use crate::flags::OutputFormat;
use alloy_primitives::Address;
use anyhow::bail;
use clap::{Subcommand, ValueEnum};
use quarry_context::QuarryContext;
use quarry_query::QueryTable;
use quarry_storage::{CacheReader, SqliteCache};
use quarry_types::{BlockRange, EntityKind, Event, EventSelector};
use tabled::{Table, builder::Builder, settings::Style};
use tracing::info;

/// The `cache` Subcommand
///
/// Creates, inspects and deletes the selected network's cache file.
///
/// # Usage
///
/// ```sh
/// quarry --network <ecosystem:network> cache <COMMAND>
/// ```
#[derive(Subcommand, Debug, Clone, PartialEq)]
#[command(about = "Manage the local cache of the selected network")]
pub enum CacheCommand {
    /// Connects to the network, checks its chain id and creates the cache.
    Init,
    /// Runs a read-only SQL statement against the cache.
    Query {
        /// The SQL statement.
        sql: String,
        /// The output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Prints the block ranges the cache holds completely.
    Ranges {
        /// Also report the ranges of this contract's event.
        #[arg(long, requires = "event")]
        address: Option<Address>,
        /// The event signature, e.g. `event Transfer(address indexed from,
        /// address indexed to, uint256 value)`.
        #[arg(long, requires = "address", value_parser = super::query::parse_event)]
        event: Option<Event>,
    },
    /// Fetches the parts of a block range the cache does not hold yet.
    Sync {
        /// What to fetch.
        #[arg(value_enum)]
        target: SyncTarget,
        /// The first block of the range.
        #[arg(long, default_value_t = 0)]
        start: u64,
        /// One past the last block of the range. Defaults to one past the
        /// chain head.
        #[arg(long)]
        stop: Option<u64>,
        /// The emitting contract, for `events`.
        #[arg(long, requires = "event")]
        address: Option<Address>,
        /// The event signature, for `events`.
        #[arg(long, requires = "address", value_parser = super::query::parse_event)]
        event: Option<Event>,
    },
    /// Prints where the cache lives and how many rows it holds.
    Info,
    /// Deletes the cache.
    Purge,
}

/// The entities `cache sync` can fetch.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    /// Block headers.
    Blocks,
    /// Transactions with their receipt outcome.
    Transactions,
    /// One contract event, named by `--address` and `--event`.
    Events,
}

impl CacheCommand {
    /// Runs the subcommand.
    pub async fn run(self, ctx: &QuarryContext) -> anyhow::Result<()> {
        match self {
            Self::Init => {
                let cache = ctx.init_cache().await?;
                println!(
                    "Initialized cache for {} (chain id {}) at {}",
                    cache.network().name,
                    cache.network().chain_id,
                    ctx.cache_path()?.display()
                );
            }
            Self::Query { sql, format } => {
                let table = QueryTable::from(ctx.open_cache()?.raw_query(&sql)?);
                println!("{}", format.render(&table)?);
            }
            Self::Ranges { address, event } => {
                let selector = address.zip(event).map(|(a, e)| EventSelector::new(a, e));
                println!("{}", ranges_table(&ctx.open_cache()?, selector)?);
            }
            Self::Sync { target, start, stop, address, event } => {
                let kind = match (target, address.zip(event)) {
                    (SyncTarget::Blocks, _) => EntityKind::Blocks,
                    (SyncTarget::Transactions, _) => EntityKind::Transactions,
                    (SyncTarget::Events, Some((address, event))) => {
                        EntityKind::ContractEvents(EventSelector::new(address, event))
                    }
                    (SyncTarget::Events, None) => bail!("`events` needs --address and --event"),
                };
                let stop = match stop {
                    Some(stop) => stop,
                    None => ctx.chain().await?.head().await?.saturating_add(1),
                };
                let range = BlockRange::new(start, stop);
                if range.start > range.stop {
                    bail!("invalid block range {range}");
                }

                let path = ctx.cache_path()?;
                if !path.is_file() {
                    bail!("no cache at {}, run `quarry cache init` first", path.display());
                }
                let filled = ctx.query().await?.sync(&kind, range).await?;
                info!(target: "cache", %kind, %range, gaps = filled.len(), "Synced cache");
                if filled.is_empty() {
                    println!("{kind} in {range} already cached");
                } else {
                    let filled = filled.iter().map(ToString::to_string).collect::<Vec<_>>();
                    println!("Fetched {kind} in {}", filled.join(" "));
                }
            }
            Self::Info => println!("{}", info_table(&ctx.open_cache()?)?),
            Self::Purge => {
                let path = ctx.cache_path()?;
                if ctx.purge_cache()? {
                    println!("Deleted {}", path.display());
                } else {
                    println!("No cache at {}", path.display());
                }
            }
        }
        Ok(())
    }
}

/// One row per entity kind, listing its contiguous ranges.
pub(crate) fn ranges_table(
    cache: &SqliteCache,
    selector: Option<EventSelector>,
) -> anyhow::Result<Table> {
    let mut kinds = vec![EntityKind::Blocks, EntityKind::Transactions];
    kinds.extend(selector.map(EntityKind::ContractEvents));

    let mut builder = Builder::default();
    builder.push_record(["kind", "ranges"]);
    for kind in &kinds {
        let ranges = cache.contiguous_ranges(kind)?;
        let ranges = if ranges.is_empty() {
            "-".to_string()
        } else {
            ranges.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
        };
        builder.push_record([kind.to_string(), ranges]);
    }
    let mut table = builder.build();
    table.with(Style::modern());
    Ok(table)
}

fn info_table(cache: &SqliteCache) -> anyhow::Result<Table> {
    let stats = cache.stats()?;
    let path = cache.path().map(|p| p.display().to_string()).unwrap_or_default();
    let mut builder = Builder::default();
    for (key, value) in [
        ("path", path),
        ("network", cache.network().name.clone()),
        ("chain id", cache.network().chain_id.to_string()),
        ("blocks", stats.blocks.to_string()),
        ("transactions", stats.transactions.to_string()),
        ("contract events", stats.contract_events.to_string()),
        ("fetched ranges", stats.fetched_ranges.to_string()),
    ] {
        builder.push_record([key.to_string(), value]);
    }
    let mut table = builder.build();
    table.with(Style::modern());
    Ok(table)
}
