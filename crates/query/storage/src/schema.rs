//! Table definitions of the cache file.

/// Version of the table layout below. Bumped whenever a table changes shape.
pub(crate) const SCHEMA_VERSION: u32 = 1;

/// Tables every cache file must contain.
pub(crate) const TABLES: &[&str] =
    &["metadata", "blocks", "transactions", "contract_events", "fetched_ranges"];

pub(crate) const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS blocks (
    number INTEGER PRIMARY KEY NOT NULL,
    hash TEXT NOT NULL,
    parent_hash TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    gas_limit INTEGER NOT NULL,
    gas_used INTEGER NOT NULL,
    base_fee_per_gas INTEGER,
    difficulty TEXT NOT NULL,
    total_difficulty TEXT,
    size INTEGER,
    miner TEXT NOT NULL,
    num_transactions INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_blocks_hash ON blocks(hash);

CREATE TABLE IF NOT EXISTS transactions (
    hash TEXT PRIMARY KEY NOT NULL,
    block_number INTEGER NOT NULL,
    transaction_index INTEGER NOT NULL,
    sender TEXT NOT NULL,
    receiver TEXT,
    value TEXT NOT NULL,
    nonce INTEGER NOT NULL,
    gas_limit INTEGER NOT NULL,
    gas_price TEXT,
    max_fee_per_gas TEXT,
    max_priority_fee_per_gas TEXT,
    gas_used INTEGER,
    status INTEGER
);
CREATE INDEX IF NOT EXISTS idx_transactions_position
    ON transactions(block_number, transaction_index);

CREATE TABLE IF NOT EXISTS contract_events (
    transaction_hash TEXT NOT NULL,
    log_index INTEGER NOT NULL,
    block_number INTEGER NOT NULL,
    transaction_index INTEGER NOT NULL,
    contract_address TEXT NOT NULL,
    event_name TEXT NOT NULL,
    event_selector TEXT NOT NULL,
    event_arguments TEXT NOT NULL,
    PRIMARY KEY (transaction_hash, log_index)
);
CREATE INDEX IF NOT EXISTS idx_contract_events_scope
    ON contract_events(contract_address, event_selector, block_number, log_index);

CREATE TABLE IF NOT EXISTS fetched_ranges (
    kind TEXT NOT NULL,
    scope TEXT NOT NULL,
    start_block INTEGER NOT NULL,
    stop_block INTEGER NOT NULL,
    PRIMARY KEY (kind, scope, start_block)
);
"#;
