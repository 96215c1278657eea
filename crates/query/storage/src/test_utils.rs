use alloy_json_abi::Event;
use alloy_primitives::{Address, B256, U256};
use quarry_types::{BlockRecord, ContractEventRecord, EventSelector, TransactionRecord};

pub(crate) fn block(number: u64) -> BlockRecord {
    BlockRecord {
        number,
        hash: B256::from(U256::from(number + 1)),
        parent_hash: B256::from(U256::from(number)),
        timestamp: 1_700_000_000 + number * 12,
        gas_limit: 30_000_000,
        gas_used: 21_000,
        base_fee_per_gas: Some(7),
        difficulty: U256::ZERO,
        total_difficulty: Some(U256::from(58_750_000_000_000_000_000_000u128)),
        size: None,
        miner: Address::repeat_byte(0x11),
        num_transactions: 1,
    }
}

pub(crate) fn transaction(block_number: u64, index: u64) -> TransactionRecord {
    TransactionRecord {
        hash: B256::from(U256::from(block_number * 1_000 + index + 1)),
        block_number,
        transaction_index: index,
        sender: Address::repeat_byte(0x22),
        receiver: (index % 2 == 0).then(|| Address::repeat_byte(0x33)),
        value: U256::from(10).pow(U256::from(18)),
        nonce: index,
        gas_limit: 21_000,
        gas_price: Some(u128::MAX),
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        gas_used: Some(21_000),
        status: Some(true),
    }
}

pub(crate) fn transfer_selector() -> EventSelector {
    let event =
        Event::parse("event Transfer(address indexed from, address indexed to, uint256 value)")
            .unwrap();
    EventSelector::new(Address::repeat_byte(0x42), event)
}

pub(crate) fn transfer(
    selector: &EventSelector,
    block_number: u64,
    log_index: u64,
) -> ContractEventRecord {
    let mut event_arguments = serde_json::Map::new();
    event_arguments.insert("from".into(), Address::repeat_byte(0xaa).to_checksum(None).into());
    event_arguments.insert("to".into(), Address::repeat_byte(0xbb).to_checksum(None).into());
    event_arguments.insert("value".into(), serde_json::json!(log_index * 100));
    ContractEventRecord {
        transaction_hash: B256::from(U256::from(block_number * 1_000 + 1)),
        log_index,
        block_number,
        transaction_index: 0,
        contract_address: selector.address,
        event_name: selector.event.name.clone(),
        event_selector: selector.key(),
        event_arguments,
    }
}
