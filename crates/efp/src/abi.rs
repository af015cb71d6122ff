//! ABI bindings and JSON-RPC log helpers for the EFP contracts.
//!
//! Events are emitted by ListRecords (one deployment per chain), AccountMetadata and
//! ListRegistry (both on Base). Views are used by the contract-read path in [crate::contract].

use alloy::primitives::{Address, Bytes, B256, U64};
use alloy::sol;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

sol! {
    /// ListRecords: list ops and list metadata, keyed by slot.
    interface IListRecords {
        event ListOp(uint256 indexed slot, bytes op);
        event UpdateListMetadata(uint256 indexed slot, string key, bytes value);

        function getListUser(uint256 slot) external view returns (address);
        function getAllListOps(uint256 slot) external view returns (bytes[] memory);
    }

    /// AccountMetadata: per-account key/value store (e.g. `primary-list`).
    interface IAccountMetadata {
        event UpdateAccountMetadata(address indexed addr, string key, bytes value);

        function getValue(address addr, string calldata key) external view returns (bytes memory);
    }

    /// ListRegistry: list NFT → storage location.
    interface IListRegistry {
        event UpdateListStorageLocation(uint256 indexed tokenId, bytes listStorageLocation);

        function getListStorageLocation(uint256 tokenId) external view returns (bytes memory);
    }
}

/// Fields every JSON-RPC log carries, independent of the event kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    pub removed: bool,
}

/// Wire shape of an `eth_getLogs` entry. Quantities arrive as `0x` hex.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: U64,
    transaction_hash: B256,
    log_index: U64,
    #[serde(default)]
    removed: bool,
}

impl From<RpcLog> for RawLog {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: log.block_number.to(),
            tx_hash: log.transaction_hash,
            log_index: log.log_index.to(),
            removed: log.removed,
        }
    }
}

/// Parse a JSON-RPC log (eth_getLogs result entry) into [RawLog].
pub fn parse_raw_log(log_value: &Value) -> Result<RawLog> {
    let log = RpcLog::deserialize(log_value).context("malformed JSON-RPC log")?;
    Ok(log.into())
}

/// Parse an address from hex. Accepts 20 bytes or a left-padded 32-byte word.
pub fn parse_address(s: &str) -> Result<Address> {
    let bytes = hex::decode(s.trim().trim_start_matches("0x")).context("address is not hex")?;
    address_from_bytes(&bytes)
        .ok_or_else(|| anyhow::anyhow!("expected 20 or 32 bytes for address, got {}", bytes.len()))
}

/// Address from raw bytes: 20 bytes as-is, or a 32-byte word (left-padded; take last 20).
pub fn address_from_bytes(bytes: &[u8]) -> Option<Address> {
    match bytes.len() {
        20 => Some(Address::from_slice(bytes)),
        32 => Some(Address::from_slice(&bytes[12..32])),
        _ => None,
    }
}

/// Lowercase `0x`-prefixed hex, the form the JSON documents use for addresses.
pub fn address_hex(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolEvent;
    use serde_json::json;

    #[test]
    fn signature_hashes_are_distinct() {
        let hashes = [
            IListRecords::ListOp::SIGNATURE_HASH,
            IListRecords::UpdateListMetadata::SIGNATURE_HASH,
            IAccountMetadata::UpdateAccountMetadata::SIGNATURE_HASH,
            IListRegistry::UpdateListStorageLocation::SIGNATURE_HASH,
        ];
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(IListRecords::ListOp::SIGNATURE, "ListOp(uint256,bytes)");
    }

    #[test]
    fn parse_raw_log_reads_rpc_shape() {
        let log = json!({
            "address": "0x41AA48Ef3c0446b46a5b1cc6337FF3d3716E2A33",
            "topics": [format!("0x{}", "11".repeat(32))],
            "data": "0xdeadbeef",
            "blockNumber": "0x10",
            "transactionHash": format!("0x{}", "22".repeat(32)),
            "logIndex": "0x3",
        });
        let raw = parse_raw_log(&log).unwrap();
        assert_eq!(
            address_hex(&raw.address),
            "0x41aa48ef3c0446b46a5b1cc6337ff3d3716e2a33"
        );
        assert_eq!(raw.block_number, 16);
        assert_eq!(raw.log_index, 3);
        assert_eq!(raw.data.to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(raw.topics.len(), 1);
        assert!(!raw.removed);
    }

    #[test]
    fn parse_raw_log_missing_field() {
        let log = json!({ "topics": [], "data": "0x" });
        let err = parse_raw_log(&log).unwrap_err();
        assert!(format!("{:#}", err).contains("missing field"));
    }

    #[test]
    fn address_from_padded_word() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xab; 20]);
        assert_eq!(address_from_bytes(&word), Some(Address::from([0xab; 20])));
        assert_eq!(address_from_bytes(&[0u8; 7]), None);
    }
}
