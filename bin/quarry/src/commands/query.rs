//! Query Subcommand

use crate::flags::OutputFormat;
use alloy_primitives::Address;
use clap::{Args, Subcommand};
use quarry_context::QuarryContext;
use quarry_types::{BlockRange, Columns, EntityKind, Event, EventSelector, QuerySpec};
use tracing::debug;

/// The `query` Subcommand
///
/// Runs a query through the query manager. Blocks missing from the cache are
/// fetched from the provider and cached on the way.
///
/// # Usage
///
/// ```sh
/// quarry query blocks --start 100 --stop 200 --columns number,hash
/// ```
#[derive(Subcommand, Debug, Clone, PartialEq)]
#[command(about = "Query blocks, transactions or contract events")]
pub enum QueryCommand {
    /// Query block headers.
    Blocks(QueryArgs),
    /// Query transactions with their receipt outcome.
    Transactions(QueryArgs),
    /// Query the decoded occurrences of one contract event.
    Events(EventArgs),
}

/// Arguments common to every query.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct QueryArgs {
    /// The first block of the range.
    #[arg(long, default_value_t = 0)]
    pub start: u64,
    /// One past the last block of the range. Defaults to one past the
    /// chain head.
    #[arg(long)]
    pub stop: Option<u64>,
    /// Comma separated columns, or `*` for all of them.
    #[arg(long, default_value = "*")]
    pub columns: Columns,
    /// A row filter such as `gas_used > 21000 and status == true`.
    #[arg(long)]
    pub filter: Option<String>,
    /// Keep every n-th block, counted from `--start`.
    #[arg(long, default_value_t = 1)]
    pub step: u64,
    /// The output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Arguments of an event query.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct EventArgs {
    /// The emitting contract.
    #[arg(long)]
    pub address: Address,
    /// The event signature, e.g. `event Transfer(address indexed from,
    /// address indexed to, uint256 value)`.
    #[arg(long, value_parser = parse_event)]
    pub event: Event,
    /// The query arguments.
    #[command(flatten)]
    pub query: QueryArgs,
}

/// Parses a human readable event signature. The `event` keyword is optional.
pub(crate) fn parse_event(signature: &str) -> Result<Event, String> {
    let signature = signature.trim();
    let signature = if signature.starts_with("event ") {
        signature.to_string()
    } else {
        format!("event {signature}")
    };
    Event::parse(&signature).map_err(|err| err.to_string())
}

impl QueryCommand {
    /// The query arguments and the entity kind they target.
    pub fn into_parts(self) -> (EntityKind, QueryArgs) {
        match self {
            Self::Blocks(args) => (EntityKind::Blocks, args),
            Self::Transactions(args) => (EntityKind::Transactions, args),
            Self::Events(EventArgs { address, event, query }) => {
                (EntityKind::ContractEvents(EventSelector::new(address, event)), query)
            }
        }
    }

    /// Runs the subcommand.
    pub async fn run(self, ctx: &QuarryContext) -> anyhow::Result<()> {
        let (kind, args) = self.into_parts();
        let stop = match args.stop {
            Some(stop) => stop,
            None => ctx.chain().await?.head().await?.saturating_add(1),
        };
        let spec = args.spec(kind, stop);
        debug!(target: "query", kind = %spec.kind, range = %spec.range, "Running query");

        let table = ctx.query().await?.perform(&spec).await?;
        println!("{}", args.format.render(&table)?);
        Ok(())
    }
}

impl QueryArgs {
    /// Builds the [`QuerySpec`] for `kind` ending before `stop`.
    pub fn spec(&self, kind: EntityKind, stop: u64) -> QuerySpec {
        let spec = QuerySpec::new(kind, BlockRange::new(self.start, stop))
            .with_columns(self.columns.clone())
            .with_step(self.step);
        match &self.filter {
            Some(filter) => spec.with_filter(filter.clone()),
            None => spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::{CHAIN_ID, context};
    use clap::Parser;
    use quarry_providers_alloy::test_utils::{FakeChainProvider, FetchMethod};
    use rstest::rstest;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        query: QueryCommand,
    }

    fn parse(args: &[&str]) -> QueryCommand {
        let args = std::iter::once("quarry").chain(args.iter().copied());
        TestCli::try_parse_from(args).unwrap().query
    }

    #[test]
    fn test_parse_blocks() {
        let (kind, args) = parse(&[
            "blocks", "--start", "10", "--stop", "20", "--columns", "number,hash", "--step", "2",
            "--filter", "number > 12", "--format", "json",
        ])
        .into_parts();
        assert_eq!(kind, EntityKind::Blocks);
        let spec = args.spec(kind, 20);
        assert_eq!(spec.range, BlockRange::new(10, 20));
        assert_eq!(spec.columns, Columns::Named(vec!["number".into(), "hash".into()]));
        assert_eq!(spec.step, 2);
        assert_eq!(spec.filter.as_deref(), Some("number > 12"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[rstest]
    #[case::with_keyword("event Transfer(address indexed from, address indexed to, uint256 value)")]
    #[case::without_keyword("Transfer(address indexed from, address indexed to, uint256 value)")]
    fn test_parse_events(#[case] signature: &str) {
        let address = "0x4200000000000000000000000000000000000006";
        let (kind, args) =
            parse(&["events", "--address", address, "--event", signature]).into_parts();
        let EntityKind::ContractEvents(selector) = kind else { panic!("expected events") };
        assert_eq!(selector.address, address.parse::<Address>().unwrap());
        assert_eq!(selector.event.name, "Transfer");
        assert_eq!(args.columns, Columns::All);
        assert_eq!(args.stop, None);
    }

    #[test]
    fn test_events_require_address_and_signature() {
        assert!(TestCli::try_parse_from(["quarry", "events", "--event", "Transfer()"]).is_err());
        assert!(
            TestCli::try_parse_from([
                "quarry",
                "events",
                "--address",
                "0x4200000000000000000000000000000000000006",
                "--event",
                "not an event",
            ])
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_stop_defaults_to_head() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeChainProvider::new(CHAIN_ID).with_head(6);
        let ctx = context(dir.path(), provider.clone());

        parse(&["blocks", "--start", "2"]).run(&ctx).await.unwrap();
        assert_eq!(provider.calls_of(FetchMethod::Blocks), vec![BlockRange::new(2, 6)]);
    }
}
