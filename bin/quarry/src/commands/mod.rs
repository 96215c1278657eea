//! Subcommands of the quarry CLI.

mod cache;
pub use cache::{CacheCommand, SyncTarget};

mod query;
pub use query::{EventArgs, QueryArgs, QueryCommand};

mod networks;
pub use networks::NetworksCommand;

#[cfg(test)]
pub(crate) mod test_utils;
