//! ABI decoding of raw logs into [`ContractEventRecord`]s.

use crate::{ContractEventRecord, EventSelector, RawLog, kind::argument_name};
use alloy_dyn_abi::{DynSolValue, EventExt};
use alloy_primitives::{LogData, hex};
use serde_json::{Map, Value as JsonValue};

/// An error decoding a log against an event ABI.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The log was emitted by a different contract than the selector names.
    #[error("log {log_index} in block {block_number} was not emitted by the selected contract")]
    AddressMismatch {
        /// Block of the offending log.
        block_number: u64,
        /// Index of the offending log.
        log_index: u64,
    },
    /// The log payload does not match the event ABI.
    #[error("failed to decode log {log_index} in block {block_number}: {source}")]
    Abi {
        /// Block of the offending log.
        block_number: u64,
        /// Index of the offending log.
        log_index: u64,
        /// The underlying ABI error.
        #[source]
        source: alloy_dyn_abi::Error,
    },
}

/// Decodes a raw log into a [`ContractEventRecord`] using the selector's ABI.
pub fn decode_log(
    selector: &EventSelector,
    log: &RawLog,
) -> Result<ContractEventRecord, DecodeError> {
    if log.address != selector.address {
        return Err(DecodeError::AddressMismatch {
            block_number: log.block_number,
            log_index: log.log_index,
        });
    }

    let data = LogData::new_unchecked(log.topics.clone(), log.data.clone());
    let decoded = selector.event.decode_log(&data).map_err(|source| DecodeError::Abi {
        block_number: log.block_number,
        log_index: log.log_index,
        source,
    })?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut event_arguments = Map::new();
    for (position, input) in selector.event.inputs.iter().enumerate() {
        let value = if input.indexed { indexed.next() } else { body.next() };
        let value = value.map_or(JsonValue::Null, |v| to_json(&v));
        event_arguments.insert(argument_name(&input.name, position), value);
    }

    Ok(ContractEventRecord {
        transaction_hash: log.transaction_hash,
        log_index: log.log_index,
        block_number: log.block_number,
        transaction_index: log.transaction_index,
        contract_address: log.address,
        event_name: selector.event.name.clone(),
        event_selector: selector.key(),
        event_arguments,
    })
}

/// Decodes a batch of logs, preserving their order.
///
/// Logs of an anonymous event cannot be told apart from the contract's other
/// logs by topic, so for anonymous events every log that does not fit the ABI
/// is skipped. For any other event a log that does not decode is an error.
pub fn decode_logs(
    selector: &EventSelector,
    logs: &[RawLog],
) -> Result<Vec<ContractEventRecord>, DecodeError> {
    let anonymous = selector.event.anonymous;
    let mut records = Vec::with_capacity(logs.len());
    for log in logs {
        match decode_log(selector, log) {
            Ok(record) => records.push(record),
            Err(DecodeError::Abi { .. }) if anonymous => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(records)
}

/// Converts a decoded ABI value to JSON.
///
/// Integers that fit in 64 bits become JSON numbers; wider integers become
/// decimal strings so that no precision is lost.
fn to_json(value: &DynSolValue) -> JsonValue {
    match value {
        DynSolValue::Bool(b) => JsonValue::Bool(*b),
        DynSolValue::Int(n, _) => {
            i64::try_from(*n).map_or_else(|_| JsonValue::String(n.to_string()), JsonValue::from)
        }
        DynSolValue::Uint(n, _) => {
            u64::try_from(*n).map_or_else(|_| JsonValue::String(n.to_string()), JsonValue::from)
        }
        DynSolValue::FixedBytes(word, size) => {
            JsonValue::String(format!("0x{}", hex::encode(&word[..*size])))
        }
        DynSolValue::Address(address) => JsonValue::String(address.to_checksum(None)),
        DynSolValue::Function(function) => {
            JsonValue::String(format!("0x{}", hex::encode(function)))
        }
        DynSolValue::Bytes(bytes) => JsonValue::String(format!("0x{}", hex::encode(bytes))),
        DynSolValue::String(s) => JsonValue::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            JsonValue::Array(items.iter().map(to_json).collect())
        }
        #[allow(unreachable_patterns)]
        _ => JsonValue::Null,
    }
}
