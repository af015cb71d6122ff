//! Event normalization: JSON-RPC logs → typed [Event]s.
//!
//! Dispatch is on `topics[0]`. Anything that does not decode is dropped with a warning so one
//! bad record never aborts a batch.

use crate::abi::{parse_raw_log, IAccountMetadata, IListRecords, IListRegistry, RawLog};
use crate::codec::{decode_operation, decode_storage_location, ListStorageLocation, Operation};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolEvent;
use anyhow::Result;
use serde_json::Value;

/// Payload of one of the four EFP events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ListOp {
        slot: U256,
        op: Bytes,
    },
    UpdateListMetadata {
        slot: U256,
        key: String,
        value: Bytes,
    },
    UpdateAccountMetadata {
        addr: Address,
        key: String,
        value: Bytes,
    },
    UpdateListStorageLocation {
        token_id: U256,
        list_storage_location: Bytes,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ListOp { .. } => "ListOp",
            EventKind::UpdateListMetadata { .. } => "UpdateListMetadata",
            EventKind::UpdateAccountMetadata { .. } => "UpdateAccountMetadata",
            EventKind::UpdateListStorageLocation { .. } => "UpdateListStorageLocation",
        }
    }
}

/// Normalized event: chain metadata plus typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub chain_id: u64,
    /// Emitting contract.
    pub address: Address,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    pub kind: EventKind,
}

impl Event {
    /// Chronological sort key. Block numbers are only comparable within one chain.
    pub fn order_key(&self) -> (u64, u64, u64) {
        (self.chain_id, self.block_number, self.log_index)
    }
}

/// Decode one JSON-RPC log observed on `chain_id`.
pub fn decode_log(chain_id: u64, log_value: &Value) -> Result<Event> {
    let raw = parse_raw_log(log_value)?;
    decode_raw(chain_id, &raw)
}

fn decode_raw(chain_id: u64, raw: &RawLog) -> Result<Event> {
    let topic0 = raw
        .topics
        .first()
        .ok_or_else(|| anyhow::anyhow!("log has no topics"))?;
    let topics = raw.topics.iter().copied();
    let data = raw.data.as_ref();

    let kind = if *topic0 == IListRecords::ListOp::SIGNATURE_HASH {
        let ev = IListRecords::ListOp::decode_raw_log_validate(topics, data)?;
        EventKind::ListOp {
            slot: ev.slot,
            op: ev.op,
        }
    } else if *topic0 == IListRecords::UpdateListMetadata::SIGNATURE_HASH {
        let ev = IListRecords::UpdateListMetadata::decode_raw_log_validate(topics, data)?;
        EventKind::UpdateListMetadata {
            slot: ev.slot,
            key: ev.key,
            value: ev.value,
        }
    } else if *topic0 == IAccountMetadata::UpdateAccountMetadata::SIGNATURE_HASH {
        let ev = IAccountMetadata::UpdateAccountMetadata::decode_raw_log_validate(topics, data)?;
        EventKind::UpdateAccountMetadata {
            addr: ev.addr,
            key: ev.key,
            value: ev.value,
        }
    } else if *topic0 == IListRegistry::UpdateListStorageLocation::SIGNATURE_HASH {
        let ev = IListRegistry::UpdateListStorageLocation::decode_raw_log_validate(topics, data)?;
        EventKind::UpdateListStorageLocation {
            token_id: ev.tokenId,
            list_storage_location: ev.listStorageLocation,
        }
    } else {
        anyhow::bail!("unrecognized event topic {}", topic0);
    };

    Ok(Event {
        chain_id,
        address: raw.address,
        block_number: raw.block_number,
        tx_hash: raw.tx_hash,
        log_index: raw.log_index,
        kind,
    })
}

/// Decode a batch of logs, dropping (and logging) anything malformed or removed.
pub fn normalize_logs(chain_id: u64, logs: &[Value]) -> Vec<Event> {
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        if log.get("removed").and_then(|r| r.as_bool()) == Some(true) {
            tracing::debug!(chain_id, "skipping removed log");
            continue;
        }
        match decode_log(chain_id, log) {
            Ok(ev) => events.push(ev),
            Err(e) => tracing::warn!(chain_id, reason = %e, "dropping malformed log"),
        }
    }
    if !logs.is_empty() && events.is_empty() {
        tracing::warn!(chain_id, raw_count = logs.len(), "logs received but none decoded");
    }
    events
}

/// A decoded list op with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOperation {
    pub operation: Operation,
    pub slot: U256,
    pub list_records_contract: Address,
    pub chain_id: u64,
    pub tx: B256,
    pub block_number: u64,
    pub log_index: u64,
}

impl ListOperation {
    /// Decode the op payload of a ListOp event; `None` for any other kind.
    pub fn from_event(ev: &Event) -> Option<Self> {
        match &ev.kind {
            EventKind::ListOp { slot, op } => Some(Self {
                operation: decode_operation(op),
                slot: *slot,
                list_records_contract: ev.address,
                chain_id: ev.chain_id,
                tx: ev.tx_hash,
                block_number: ev.block_number,
                log_index: ev.log_index,
            }),
            _ => None,
        }
    }
}

/// A decoded storage location for a list token, observed at `block_number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListStorageLocationToken {
    pub location: ListStorageLocation,
    pub token_id: U256,
    pub block_number: u64,
}

impl ListStorageLocationToken {
    /// Decode the payload of an UpdateListStorageLocation event; `None` for any other kind.
    pub fn from_event(ev: &Event) -> Option<Self> {
        match &ev.kind {
            EventKind::UpdateListStorageLocation {
                token_id,
                list_storage_location,
            } => Some(Self {
                location: decode_storage_location(list_storage_location),
                token_id: *token_id,
                block_number: ev.block_number,
            }),
            _ => None,
        }
    }
}
