//! JSON documents: the canonical log and per-account graph views.
//!
//! 256-bit integers are written as decimal strings; addresses as lowercase hex.

use crate::abi::{address_hex, parse_address};
use crate::codec::{Opcode, Operation};
use crate::event::ListOperation;
use crate::graph::{Direction, GraphView};
use crate::reconcile::CanonicalOperation;
use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;

/// One canonical-log entry as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub list_user_address: String,
    pub record_address: String,
    pub opcode: String,
    #[serde(default)]
    pub record_type_description: String,
    #[serde(default = "default_byte")]
    pub version: String,
    #[serde(default = "default_byte")]
    pub record_version: String,
    #[serde(default = "default_byte")]
    pub record_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(deserialize_with = "decimal_string")]
    pub slot: String,
    #[serde(deserialize_with = "decimal_string")]
    pub chain_id: String,
    #[serde(default)]
    pub list_records_contract: String,
    #[serde(default = "zero", deserialize_with = "decimal_string")]
    pub token_id: String,
    #[serde(default)]
    pub tx: String,
    #[serde(default = "zero", deserialize_with = "decimal_string")]
    pub block_number: String,
    #[serde(default = "zero", deserialize_with = "decimal_string")]
    pub log_index: String,
}

fn default_byte() -> String {
    "01".to_string()
}

fn zero() -> String {
    "0".to_string()
}

/// Accept a JSON integer or a decimal/`0x` string; normalize to a decimal string.
fn decimal_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n.to_string()),
        NumOrStr::Str(s) => U256::from_str(s.trim())
            .map(|v| v.to_string())
            .map_err(|e| serde::de::Error::custom(format!("invalid integer {:?}: {}", s, e))),
    }
}

impl From<&CanonicalOperation> for CanonicalRecord {
    fn from(c: &CanonicalOperation) -> Self {
        let op = &c.list_op.operation;
        Self {
            list_user_address: address_hex(&c.list_user_address),
            record_address: address_hex(&op.record_address),
            opcode: op.opcode.to_hex(),
            record_type_description: op.opcode.description().to_string(),
            version: format!("{:02x}", op.version),
            record_version: format!("{:02x}", op.record_version),
            record_type: format!("{:02x}", op.record_type),
            tag: op.tag.clone(),
            slot: c.list_op.slot.to_string(),
            chain_id: c.list_op.chain_id.to_string(),
            list_records_contract: address_hex(&c.list_op.list_records_contract),
            token_id: c.token_id.to_string(),
            tx: format!("0x{}", hex::encode(c.list_op.tx)),
            block_number: c.list_op.block_number.to_string(),
            log_index: c.list_op.log_index.to_string(),
        }
    }
}

impl TryFrom<&CanonicalRecord> for CanonicalOperation {
    type Error = anyhow::Error;

    fn try_from(r: &CanonicalRecord) -> Result<Self> {
        let hex_byte = |field: &str, s: &str| {
            u8::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16)
                .with_context(|| format!("{} is not a hex byte: {:?}", field, s))
        };
        let opcode = Opcode::from_hex(&r.opcode)?;
        let operation = Operation {
            version: hex_byte("version", &r.version)?,
            opcode,
            record_version: hex_byte("recordVersion", &r.record_version)?,
            record_type: hex_byte("recordType", &r.record_type)?,
            record_address: parse_address(&r.record_address).context("recordAddress")?,
            tag: if opcode == Opcode::Tag {
                r.tag.clone()
            } else {
                String::new()
            },
        };
        let list_records_contract = if r.list_records_contract.is_empty() {
            Address::ZERO
        } else {
            parse_address(&r.list_records_contract).context("listRecordsContract")?
        };
        let tx = if r.tx.is_empty() {
            B256::ZERO
        } else {
            B256::from_str(r.tx.trim()).context("tx")?
        };
        Ok(CanonicalOperation {
            list_op: ListOperation {
                operation,
                slot: U256::from_str(&r.slot).context("slot")?,
                list_records_contract,
                chain_id: r.chain_id.parse().context("chainId")?,
                tx,
                block_number: r.block_number.parse().context("blockNumber")?,
                log_index: r.log_index.parse().context("logIndex")?,
            },
            list_user_address: parse_address(&r.list_user_address).context("listUserAddress")?,
            token_id: U256::from_str(&r.token_id).context("tokenId")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub address: String,
    pub tag: String,
}

/// Document form of a [GraphView].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphViewRecord {
    pub address: String,
    pub direction: Direction,
    pub edges: Vec<String>,
    pub count: usize,
    pub tags: Vec<TagRecord>,
}

impl From<&GraphView> for GraphViewRecord {
    fn from(v: &GraphView) -> Self {
        Self {
            address: address_hex(&v.address),
            direction: v.direction,
            edges: v.edges.iter().map(address_hex).collect(),
            count: v.count,
            tags: v
                .tags
                .iter()
                .map(|t| TagRecord {
                    address: address_hex(&t.address),
                    tag: t.tag.clone(),
                })
                .collect(),
        }
    }
}

pub fn to_records(log: &[CanonicalOperation]) -> Vec<CanonicalRecord> {
    log.iter().map(CanonicalRecord::from).collect()
}

/// Parse records back into canonical ops. Records that do not parse are dropped with a warning.
pub fn from_records(records: &[CanonicalRecord]) -> Vec<CanonicalOperation> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            CanonicalOperation::try_from(r)
                .map_err(|e| tracing::warn!(index = i, reason = %e, "skipping canonical record"))
                .ok()
        })
        .collect()
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize document")?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote document");
    Ok(())
}

pub fn write_canonical_log(path: &Path, log: &[CanonicalOperation]) -> Result<()> {
    write_json(path, &to_records(log))
}

pub fn read_canonical_log(path: &Path) -> Result<Vec<CanonicalOperation>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&text).context("parse canonical log")?;
    let records: Vec<CanonicalRecord> = values
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| {
            serde_json::from_value(v)
                .map_err(|e| tracing::warn!(index = i, reason = %e, "skipping canonical record"))
                .ok()
        })
        .collect();
    Ok(from_records(&records))
}
