//! Reconciliation: join decoded list ops against the resolved indirection maps.
//!
//! An op survives only if
//! 1. its (chain, contract, slot) has a resolved list user,
//! 2. a list token currently points at that same (chain, contract, slot), and
//! 3. that token is the list user's primary list.
//!
//! Each check is a hash lookup, so the join is linear in the number of ops.

use crate::event::{Event, ListOperation, ListStorageLocationToken};
use crate::resolver::{
    resolve_list_users, resolve_primary_lists, resolve_storage_locations, ListLocation,
    ResolvedListUser,
};
use alloy::primitives::{Address, U256};
use std::collections::HashMap;

/// A list op attributed to the account whose primary list holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalOperation {
    pub list_op: ListOperation,
    pub list_user_address: Address,
    /// Token through which the op was attributed (zero when unknown).
    pub token_id: U256,
}

/// Why an op was left out of the canonical log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoListUser,
    NoStorageLocation,
    NotPrimaryList,
}

/// Drop counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub total: usize,
    pub kept: usize,
    pub no_list_user: usize,
    pub no_storage_location: usize,
    pub not_primary_list: usize,
}

impl ReconcileStats {
    fn record(&mut self, outcome: Result<(), DropReason>) {
        self.total += 1;
        match outcome {
            Ok(()) => self.kept += 1,
            Err(DropReason::NoListUser) => self.no_list_user += 1,
            Err(DropReason::NoStorageLocation) => self.no_storage_location += 1,
            Err(DropReason::NotPrimaryList) => self.not_primary_list += 1,
        }
    }
}

type LocationKey = (U256, Address, U256);

/// Holds the three resolved maps and joins ops against them.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    list_users: HashMap<ListLocation, ResolvedListUser>,
    primary_lists: HashMap<Address, U256>,
    /// Storage locations re-keyed by where they point.
    tokens_by_location: HashMap<LocationKey, ListStorageLocationToken>,
}

impl Reconciler {
    pub fn new(
        list_users: HashMap<ListLocation, ResolvedListUser>,
        primary_lists: HashMap<Address, U256>,
        storage_locations: HashMap<U256, ListStorageLocationToken>,
    ) -> Self {
        let mut tokens_by_location: HashMap<LocationKey, ListStorageLocationToken> =
            HashMap::new();
        for token in storage_locations.into_values() {
            let key = (
                token.location.chain_id,
                token.location.list_records_contract,
                token.location.slot,
            );
            let replace = tokens_by_location
                .get(&key)
                .map(|current| {
                    (token.block_number, token.token_id) > (current.block_number, current.token_id)
                })
                .unwrap_or(true);
            if replace {
                tokens_by_location.insert(key, token);
            }
        }
        Self {
            list_users,
            primary_lists,
            tokens_by_location,
        }
    }

    /// Sort events chronologically, run the three reductions and decode list ops.
    pub fn from_events(mut events: Vec<Event>) -> (Self, Vec<ListOperation>) {
        events.sort_by_key(Event::order_key);
        let list_users = resolve_list_users(&events);
        let primary_lists = resolve_primary_lists(&events);
        let tokens: Vec<ListStorageLocationToken> = events
            .iter()
            .filter_map(ListStorageLocationToken::from_event)
            .collect();
        let storage_locations = resolve_storage_locations(&tokens);
        let ops: Vec<ListOperation> = events.iter().filter_map(ListOperation::from_event).collect();
        tracing::info!(
            list_users = list_users.len(),
            primary_lists = primary_lists.len(),
            storage_locations = storage_locations.len(),
            list_ops = ops.len(),
            "resolved list indirection"
        );
        (
            Self::new(list_users, primary_lists, storage_locations),
            ops,
        )
    }

    /// Attribute one op, or say why it cannot be attributed.
    pub fn resolve(&self, op: &ListOperation) -> Result<CanonicalOperation, DropReason> {
        let location = ListLocation {
            chain_id: op.chain_id,
            contract: op.list_records_contract,
            slot: op.slot,
        };
        let list_user = self
            .list_users
            .get(&location)
            .ok_or(DropReason::NoListUser)?;

        let key = (U256::from(op.chain_id), op.list_records_contract, op.slot);
        let token = self
            .tokens_by_location
            .get(&key)
            .ok_or(DropReason::NoStorageLocation)?;

        match self.primary_lists.get(&list_user.user) {
            Some(primary) if *primary == token.token_id => Ok(CanonicalOperation {
                list_op: op.clone(),
                list_user_address: list_user.user,
                token_id: token.token_id,
            }),
            _ => Err(DropReason::NotPrimaryList),
        }
    }

    /// Canonical log: the attributable ops, in input order.
    pub fn reconcile(&self, ops: &[ListOperation]) -> (Vec<CanonicalOperation>, ReconcileStats) {
        let mut stats = ReconcileStats::default();
        let mut out = Vec::new();
        for op in ops {
            match self.resolve(op) {
                Ok(canonical) => {
                    stats.record(Ok(()));
                    out.push(canonical);
                }
                Err(reason) => {
                    tracing::trace!(
                        chain_id = op.chain_id,
                        slot = %op.slot,
                        tx = %op.tx,
                        ?reason,
                        "list op not attributable"
                    );
                    stats.record(Err(reason));
                }
            }
        }
        tracing::info!(
            total = stats.total,
            kept = stats.kept,
            no_list_user = stats.no_list_user,
            no_storage_location = stats.no_storage_location,
            not_primary_list = stats.not_primary_list,
            "reconciled list ops"
        );
        (out, stats)
    }
}

/// Full reconciliation over a mixed, unsorted event set.
pub fn reconcile_events(events: Vec<Event>) -> Vec<CanonicalOperation> {
    let (reconciler, ops) = Reconciler::from_events(events);
    reconciler.reconcile(&ops).0
}
