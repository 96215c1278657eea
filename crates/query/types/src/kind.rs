//! Entity kinds that a query can target.

use crate::{BlockRecord, ContractEventRecord, Record, TransactionRecord};
use alloy_json_abi::Event;
use alloy_primitives::{Address, B256, keccak256};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A contract event to query: the emitting address and the event ABI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSelector {
    /// The emitting contract.
    pub address: Address,
    /// The event ABI used to decode matching logs.
    pub event: Event,
}

impl EventSelector {
    /// Creates a new [`EventSelector`].
    pub const fn new(address: Address, event: Event) -> Self {
        Self { address, event }
    }

    /// Returns topic 0 for non-anonymous events.
    pub fn topic0(&self) -> Option<B256> {
        (!self.event.anonymous).then(|| self.event.selector())
    }

    /// Returns the selector stored with every cached occurrence of this event.
    ///
    /// This is topic 0 for regular events. Anonymous events carry no topic 0,
    /// so their key is derived from the signature and cannot collide with the
    /// topic 0 of a regular event.
    pub fn key(&self) -> B256 {
        match self.topic0() {
            Some(topic0) => topic0,
            None => keccak256(format!("anonymous {}", self.event.signature())),
        }
    }

    /// The key under which fetched ranges of this event are tracked.
    ///
    /// Two selectors share a scope exactly when they decode the same logs.
    pub fn scope(&self) -> String {
        format!("{:#x}:{:#x}", self.address, self.key())
    }
}

/// The kind of entity a query targets.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Block headers.
    #[display("blocks")]
    Blocks,
    /// Transactions with receipt outcome.
    #[display("transactions")]
    Transactions,
    /// Decoded occurrences of one contract event.
    #[display("contract_events")]
    ContractEvents(EventSelector),
}

impl EntityKind {
    /// Returns the names of every column available for this kind.
    ///
    /// Contract events expose the fixed event columns followed by the names
    /// of the event's inputs.
    pub fn columns(&self) -> Vec<String> {
        let fixed = match self {
            Self::Blocks => BlockRecord::COLUMNS,
            Self::Transactions => TransactionRecord::COLUMNS,
            Self::ContractEvents(_) => ContractEventRecord::COLUMNS,
        };
        let mut columns: Vec<String> = fixed.iter().map(ToString::to_string).collect();
        if let Self::ContractEvents(selector) = self {
            for (i, input) in selector.event.inputs.iter().enumerate() {
                columns.push(argument_name(&input.name, i));
            }
        }
        columns
    }

    /// Returns the default columns shown when a query asks for `*`.
    pub fn default_columns(&self) -> Vec<String> {
        match self {
            Self::ContractEvents(_) => {
                self.columns().into_iter().filter(|c| c != "event_arguments").collect()
            }
            _ => self.columns(),
        }
    }

    /// The name of the cache table holding this kind.
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Transactions => "transactions",
            Self::ContractEvents(_) => "contract_events",
        }
    }
}

/// Returns the column name of an event input.
///
/// Unnamed inputs fall back to their position. Inputs named like a fixed
/// event column get an `arg_` prefix so both stay addressable.
pub(crate) fn argument_name(name: &str, position: usize) -> String {
    if name.is_empty() {
        format!("arg{position}")
    } else if ContractEventRecord::COLUMNS.contains(&name) {
        format!("arg_{name}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> Event {
        Event::parse("event Transfer(address indexed from, address indexed to, uint256 value)")
            .unwrap()
    }

    #[test]
    fn test_event_columns_include_inputs() {
        let kind = EntityKind::ContractEvents(EventSelector::new(Address::ZERO, transfer()));
        let columns = kind.columns();
        assert!(columns.ends_with(&["from".to_string(), "to".to_string(), "value".to_string()]));
        assert!(columns.contains(&"event_arguments".to_string()));
        assert!(!kind.default_columns().contains(&"event_arguments".to_string()));
    }

    #[test]
    fn test_scope_distinguishes_address_and_event() {
        let a = EventSelector::new(Address::ZERO, transfer());
        let b = EventSelector::new(Address::repeat_byte(1), transfer());
        assert_ne!(a.scope(), b.scope());
        assert_eq!(a.topic0(), Some(transfer().selector()));
    }

    #[test]
    fn test_anonymous_events_get_distinct_scopes() {
        let a = Event::parse("event Ping(uint256 id) anonymous").unwrap();
        let b = Event::parse("event Pong(uint256 id) anonymous").unwrap();
        let a = EventSelector::new(Address::ZERO, a);
        let b = EventSelector::new(Address::ZERO, b);

        assert_eq!(a.topic0(), None);
        assert_ne!(a.key(), B256::ZERO);
        assert_ne!(a.key(), b.key());
        assert_ne!(a.scope(), b.scope());

        let regular = Event::parse("event Ping(uint256 id)").unwrap();
        let regular = EventSelector::new(Address::ZERO, regular);
        assert_eq!(regular.key(), regular.event.selector());
        assert_ne!(regular.key(), a.key());
    }

    #[test]
    fn test_inputs_named_like_fixed_columns_are_prefixed() {
        let event = Event::parse("event Moved(uint256 block_number, uint256 log_index, uint256 to)")
            .unwrap();
        let kind = EntityKind::ContractEvents(EventSelector::new(Address::ZERO, event));
        let columns = kind.columns();

        assert!(columns.ends_with(&[
            "arg_block_number".to_string(),
            "arg_log_index".to_string(),
            "to".to_string()
        ]));
        assert_eq!(columns.iter().filter(|c| *c == "block_number").count(), 1);
        assert_eq!(columns.iter().filter(|c| *c == "log_index").count(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityKind::Blocks.to_string(), "blocks");
        assert_eq!(EntityKind::Transactions.table(), "transactions");
    }
}
