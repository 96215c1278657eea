//! Record, range and query types shared by the quarry cache, providers and
//! query manager.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod range;
pub use range::BlockRange;

mod value;
pub use value::Value;

mod records;
pub use records::{
    BlockRecord, ContractEventRecord, RawLog, Record, Records, TransactionRecord,
};

mod kind;
pub use kind::{EntityKind, EventSelector};

mod spec;
pub use spec::{Columns, QuerySpec};

mod decode;
pub use decode::{DecodeError, decode_log, decode_logs};

pub use alloy_json_abi::Event;
