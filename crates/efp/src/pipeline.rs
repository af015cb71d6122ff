//! End-to-end runs: full event backfill + reconciliation, and the contract-read path.

use crate::abi::{IAccountMetadata, IListRecords, IListRegistry};
use crate::codec::decode_operation;
use crate::config::{Chain, SyncConfig};
use crate::contract::ListReader;
use crate::event::{Event, ListOperation};
use crate::fetcher::{LogFetcher, LogSource};
use crate::graph::{replay, Direction, GraphState};
use crate::reconcile::{reconcile_events, CanonicalOperation};
use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use anyhow::Context;
use futures_util::future::join_all;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} has no primary list")]
    NoPrimaryList(Address),
    #[error("{account} does not hold a valid list (list user is {list_user})")]
    NoValidList { account: Address, list_user: Address },
    #[error("primary list {0} has no storage location")]
    NoStorageLocation(U256),
    #[error("storage location points at unconfigured chain {0}")]
    UnknownChain(U256),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Every log source a full rebuild reads.
pub fn log_sources(config: &SyncConfig) -> Vec<LogSource> {
    let mut sources: Vec<LogSource> = config
        .chains
        .iter()
        .map(|c| LogSource {
            name: "ListRecords",
            chain_id: c.chain.id(),
            http_url: c.http_url.clone(),
            address: c.list_records,
            topic0s: vec![
                IListRecords::ListOp::SIGNATURE_HASH,
                IListRecords::UpdateListMetadata::SIGNATURE_HASH,
            ],
            start_block: c.start_block,
        })
        .collect();
    if let Some(base) = config.chain(Chain::Base) {
        sources.push(LogSource {
            name: "AccountMetadata",
            chain_id: base.chain.id(),
            http_url: base.http_url.clone(),
            address: config.account_metadata,
            topic0s: vec![IAccountMetadata::UpdateAccountMetadata::SIGNATURE_HASH],
            start_block: config.registry_start_block,
        });
        sources.push(LogSource {
            name: "ListRegistry",
            chain_id: base.chain.id(),
            http_url: base.http_url.clone(),
            address: config.registry,
            topic0s: vec![IListRegistry::UpdateListStorageLocation::SIGNATURE_HASH],
            start_block: config.registry_start_block,
        });
    }
    sources
}

/// Fetch every source concurrently and normalize. A source whose tip cannot be read is
/// skipped with a warning.
pub async fn collect_events(config: &SyncConfig) -> Vec<Event> {
    let fetcher = LogFetcher::new(config.fetch.clone());
    let sources = log_sources(config);
    let results = join_all(sources.iter().map(|s| fetcher.fetch_events(s))).await;
    let mut events = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(mut evs) => {
                tracing::info!(source = source.name, chain_id = source.chain_id, count = evs.len(), "collected events");
                events.append(&mut evs);
            }
            Err(e) => tracing::warn!(
                source = source.name,
                chain_id = source.chain_id,
                reason = %e,
                "source unavailable, continuing without it"
            ),
        }
    }
    events
}

/// Rebuild the canonical log from genesis.
pub async fn build_state(config: &SyncConfig) -> Vec<CanonicalOperation> {
    let events = collect_events(config).await;
    reconcile_events(events)
}

/// Read `account`'s following graph straight from contract state, without scanning logs.
pub async fn following_from_contract(
    config: &SyncConfig,
    account: Address,
) -> Result<GraphState, PipelineError> {
    let base = config
        .chain(Chain::Base)
        .ok_or_else(|| anyhow::anyhow!("Base RPC not configured"))?;
    let base_reader = ListReader::new(base.http_url.clone());

    let token_id = base_reader
        .primary_list(&config.account_metadata, account)
        .await?
        .ok_or(PipelineError::NoPrimaryList(account))?;
    let location = base_reader
        .list_storage_location(&config.registry, token_id)
        .await?;
    if location.is_absent() {
        return Err(PipelineError::NoStorageLocation(token_id));
    }

    let chain_id: u64 = location
        .chain_id
        .try_into()
        .map_err(|_| PipelineError::UnknownChain(location.chain_id))?;
    let chain = Chain::from_id(chain_id)
        .and_then(|c| config.chain(c))
        .ok_or(PipelineError::UnknownChain(location.chain_id))?;
    let reader = ListReader::new(chain.http_url.clone());

    let list_user = reader
        .list_user(&location.list_records_contract, location.slot)
        .await?;
    if list_user != account {
        return Err(PipelineError::NoValidList { account, list_user });
    }

    let raw_ops = reader
        .all_list_ops(&location.list_records_contract, location.slot)
        .await
        .context("getAllListOps")?;
    tracing::info!(account = %account, token_id = %token_id, ops = raw_ops.len(), "read list ops from contract");

    let log: Vec<CanonicalOperation> = raw_ops
        .iter()
        .enumerate()
        .map(|(i, op)| CanonicalOperation {
            list_op: ListOperation {
                operation: decode_operation(op),
                slot: location.slot,
                list_records_contract: location.list_records_contract,
                chain_id,
                tx: B256::ZERO,
                block_number: 0,
                log_index: i as u64,
            },
            list_user_address: account,
            token_id,
        })
        .collect();
    Ok(replay(&log, Direction::Following))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig::from_lookup(|name| match name {
            "BASE_RPC_URL" => Some("http://base".to_string()),
            "ETH_RPC_URL" => Some("http://eth".to_string()),
            "ACCOUNT_METADATA_CONTRACT_ADDRESS" => Some(format!("0x{}", "01".repeat(20))),
            "REGISTRY_CONTRACT_ADDRESS" => Some(format!("0x{}", "02".repeat(20))),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn sources_cover_every_event_kind() {
        let sources = log_sources(&config());
        assert_eq!(sources.len(), 4);
        let list_records: Vec<u64> = sources
            .iter()
            .filter(|s| s.name == "ListRecords")
            .map(|s| s.chain_id)
            .collect();
        assert_eq!(list_records, vec![8453, 1]);
        let registry = sources.iter().find(|s| s.name == "ListRegistry").unwrap();
        assert_eq!(registry.address, Address::from([0x02; 20]));
        assert_eq!(registry.chain_id, 8453);
        assert_eq!(
            registry.topic0s,
            vec![IListRegistry::UpdateListStorageLocation::SIGNATURE_HASH]
        );
    }
}
