//! Last-writer-wins reductions that resolve list indirection.
//!
//! - slot (on a given chain/contract) → list user
//! - account → primary list token id
//! - token id → storage location (greatest block number wins)
//!
//! The first two overwrite on iterate, so callers must pass events sorted by
//! [Event::order_key]. The third compares block numbers explicitly.

use crate::abi::address_from_bytes;
use crate::event::{Event, EventKind, ListStorageLocationToken};
use alloy::primitives::{Address, U256};
use std::collections::HashMap;

pub const LIST_USER_KEY: &str = "user";
pub const PRIMARY_LIST_KEY: &str = "primary-list";

/// Where a list's ops live: chain, ListRecords contract, slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListLocation {
    pub chain_id: u64,
    pub contract: Address,
    pub slot: U256,
}

/// Latest `user` metadata for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedListUser {
    pub user: Address,
    pub chain_id: u64,
    pub list_records_contract: Address,
}

/// slot → current list user, keyed by the full location so equal slots on other
/// chains or contracts never collide.
pub fn resolve_list_users(events: &[Event]) -> HashMap<ListLocation, ResolvedListUser> {
    let mut out = HashMap::new();
    for ev in events {
        let EventKind::UpdateListMetadata { slot, key, value } = &ev.kind else {
            continue;
        };
        if key != LIST_USER_KEY {
            continue;
        }
        let Some(user) = address_from_bytes(value) else {
            tracing::warn!(
                chain_id = ev.chain_id,
                slot = %slot,
                len = value.len(),
                "list user value is not an address, skipping"
            );
            continue;
        };
        let location = ListLocation {
            chain_id: ev.chain_id,
            contract: ev.address,
            slot: *slot,
        };
        out.insert(
            location,
            ResolvedListUser {
                user,
                chain_id: ev.chain_id,
                list_records_contract: ev.address,
            },
        );
    }
    out
}

/// account → current primary list token id. An empty value clears the assignment.
pub fn resolve_primary_lists(events: &[Event]) -> HashMap<Address, U256> {
    let mut out = HashMap::new();
    for ev in events {
        let EventKind::UpdateAccountMetadata { addr, key, value } = &ev.kind else {
            continue;
        };
        if key != PRIMARY_LIST_KEY {
            continue;
        }
        if value.is_empty() {
            out.remove(addr);
            continue;
        }
        match U256::try_from_be_slice(value) {
            Some(token_id) => {
                out.insert(*addr, token_id);
            }
            None => tracing::warn!(
                account = %addr,
                len = value.len(),
                "primary-list value wider than 256 bits, skipping"
            ),
        }
    }
    out
}

/// token id → latest storage location. Ties keep the first one seen.
pub fn resolve_storage_locations(
    tokens: &[ListStorageLocationToken],
) -> HashMap<U256, ListStorageLocationToken> {
    let mut out: HashMap<U256, ListStorageLocationToken> = HashMap::new();
    for token in tokens {
        if token.location.is_absent() {
            tracing::debug!(token_id = %token.token_id, "storage location absent, skipping");
            continue;
        }
        let newer = out
            .get(&token.token_id)
            .map(|current| token.block_number > current.block_number)
            .unwrap_or(true);
        if newer {
            out.insert(token.token_id, token.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ListStorageLocation;
    use alloy::primitives::B256;

    fn event(chain_id: u64, contract: Address, block_number: u64, kind: EventKind) -> Event {
        Event {
            chain_id,
            address: contract,
            block_number,
            tx_hash: B256::ZERO,
            log_index: 0,
            kind,
        }
    }

    fn list_meta(slot: u64, key: &str, value: Vec<u8>) -> EventKind {
        EventKind::UpdateListMetadata {
            slot: U256::from(slot),
            key: key.to_string(),
            value: value.into(),
        }
    }

    fn token(token_id: u64, slot: u64, block_number: u64) -> ListStorageLocationToken {
        ListStorageLocationToken {
            location: ListStorageLocation {
                version: 1,
                kind: 1,
                chain_id: U256::from(8453u64),
                list_records_contract: Address::from([0x0c; 20]),
                slot: U256::from(slot),
            },
            token_id: U256::from(token_id),
            block_number,
        }
    }

    #[test]
    fn list_user_last_writer_wins() {
        let c = Address::from([0x0c; 20]);
        let events = vec![
            event(8453, c, 1, list_meta(5, "user", vec![0xaa; 20])),
            event(8453, c, 2, list_meta(5, "manager", vec![0xbb; 20])),
            event(8453, c, 3, list_meta(5, "user", vec![0xcc; 20])),
        ];
        let users = resolve_list_users(&events);
        assert_eq!(users.len(), 1);
        let loc = ListLocation {
            chain_id: 8453,
            contract: c,
            slot: U256::from(5u64),
        };
        assert_eq!(users[&loc].user, Address::from([0xcc; 20]));
        assert_eq!(users[&loc].list_records_contract, c);
    }

    #[test]
    fn list_user_keys_do_not_collide_across_chains() {
        let c = Address::from([0x0c; 20]);
        let events = vec![
            event(8453, c, 1, list_meta(5, "user", vec![0xaa; 20])),
            event(10, c, 2, list_meta(5, "user", vec![0xbb; 20])),
            event(10, c, 3, list_meta(6, "user", vec![0x01; 3])),
        ];
        let users = resolve_list_users(&events);
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn primary_list_last_writer_wins() {
        let user = Address::from([0xaa; 20]);
        let meta = |value: Vec<u8>, key: &str| EventKind::UpdateAccountMetadata {
            addr: user,
            key: key.to_string(),
            value: value.into(),
        };
        let mut word = vec![0u8; 32];
        word[31] = 9;
        let events = vec![
            event(8453, Address::ZERO, 1, meta(vec![0x01], "primary-list")),
            event(8453, Address::ZERO, 2, meta(vec![0x02], "avatar")),
            event(8453, Address::ZERO, 3, meta(word, "primary-list")),
        ];
        let primary = resolve_primary_lists(&events);
        assert_eq!(primary[&user], U256::from(9u64));
    }

    #[test]
    fn storage_location_latest_block_wins_in_either_order() {
        let older = token(7, 1, 100);
        let newer = token(7, 2, 200);
        for input in [vec![older.clone(), newer.clone()], vec![newer.clone(), older.clone()]] {
            let resolved = resolve_storage_locations(&input);
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[&U256::from(7u64)].block_number, 200);
            assert_eq!(resolved[&U256::from(7u64)].location.slot, U256::from(2u64));
        }
    }

    #[test]
    fn cleared_primary_list_is_unassigned() {
        let user = Address::from([0xaa; 20]);
        let meta = |value: Vec<u8>| EventKind::UpdateAccountMetadata {
            addr: user,
            key: "primary-list".to_string(),
            value: value.into(),
        };
        let events = vec![
            event(8453, Address::ZERO, 1, meta(vec![0x00])),
            event(8453, Address::ZERO, 2, meta(vec![])),
        ];
        assert!(resolve_primary_lists(&events).is_empty());

        let never_set = vec![event(8453, Address::ZERO, 1, meta(vec![]))];
        assert!(resolve_primary_lists(&never_set).is_empty());
    }

    #[test]
    fn storage_location_same_block_keeps_first() {
        let first = token(4, 1, 300);
        let second = token(4, 2, 300);
        let resolved = resolve_storage_locations(&[first, second]);
        assert_eq!(resolved[&U256::from(4u64)].location.slot, U256::from(1u64));
    }

    #[test]
    fn storage_location_sentinel_is_skipped() {
        let absent = ListStorageLocationToken {
            location: ListStorageLocation::default(),
            token_id: U256::from(3u64),
            block_number: 500,
        };
        let resolved = resolve_storage_locations(&[token(3, 1, 100), absent]);
        assert_eq!(resolved[&U256::from(3u64)].block_number, 100);
    }
}
