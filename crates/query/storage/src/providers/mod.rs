//! Per-table providers of the cache.
//!
//! Each provider borrows a connection (or an open transaction, which derefs
//! to one) and owns the SQL for a single table:
//! - Block headers ([`BlockProvider`])
//! - Transactions ([`TransactionProvider`])
//! - Decoded contract events ([`EventProvider`])
//! - Fetch coverage of sparse kinds ([`FetchedRangeProvider`])
//! - Cache metadata ([`MetadataProvider`])
mod block_provider;
pub(crate) use block_provider::BlockProvider;

mod transaction_provider;
pub(crate) use transaction_provider::TransactionProvider;

mod event_provider;
pub(crate) use event_provider::EventProvider;

mod range_provider;
pub(crate) use range_provider::FetchedRangeProvider;

mod metadata_provider;
pub(crate) use metadata_provider::MetadataProvider;
