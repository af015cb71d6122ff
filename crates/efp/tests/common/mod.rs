//! Common helpers for integration tests: encoded EFP logs and a stub JSON-RPC server.

#![allow(dead_code)]

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};
use efp::abi::{IAccountMetadata, IListRecords, IListRegistry};
use efp::codec::{encode_storage_location, ListStorageLocation};
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

pub const BASE: u64 = 8453;

pub fn list_records() -> Address {
    Address::from([0x0c; 20])
}

pub fn registry() -> Address {
    Address::from([0x0e; 20])
}

pub fn account_metadata() -> Address {
    Address::from([0x0a; 20])
}

/// JSON-RPC log shape for an encoded event.
pub fn rpc_log<E: SolEvent>(ev: &E, address: Address, block: u64, log_index: u64) -> Value {
    let data = ev.encode_log_data();
    json!({
        "address": format!("0x{}", hex::encode(address)),
        "topics": data.topics().iter().map(|t| format!("0x{}", hex::encode(t))).collect::<Vec<_>>(),
        "data": format!("0x{}", hex::encode(&data.data)),
        "blockNumber": format!("0x{:x}", block),
        "transactionHash": format!("0x{}", hex::encode(B256::with_last_byte(log_index as u8))),
        "logIndex": format!("0x{:x}", log_index),
        "removed": false,
    })
}

/// Encoded list op: version 1, record version 1, record type 1 (address).
pub fn list_op_bytes(opcode: u8, record: Address, tag: &str) -> Vec<u8> {
    let mut out = vec![1u8, opcode, 1, 1];
    out.extend_from_slice(record.as_slice());
    out.extend_from_slice(tag.as_bytes());
    out
}

pub fn list_op(slot: u64, opcode: u8, record: Address, tag: &str) -> IListRecords::ListOp {
    IListRecords::ListOp {
        slot: U256::from(slot),
        op: list_op_bytes(opcode, record, tag).into(),
    }
}

pub fn list_user(slot: u64, user: Address) -> IListRecords::UpdateListMetadata {
    IListRecords::UpdateListMetadata {
        slot: U256::from(slot),
        key: "user".to_string(),
        value: user.to_vec().into(),
    }
}

pub fn primary_list(account: Address, token_id: u64) -> IAccountMetadata::UpdateAccountMetadata {
    IAccountMetadata::UpdateAccountMetadata {
        addr: account,
        key: "primary-list".to_string(),
        value: U256::from(token_id).to_be_bytes::<32>().to_vec().into(),
    }
}

pub fn storage_location_bytes(chain_id: u64, contract: Address, slot: u64) -> Vec<u8> {
    encode_storage_location(&ListStorageLocation {
        version: 1,
        kind: 1,
        chain_id: U256::from(chain_id),
        list_records_contract: contract,
        slot: U256::from(slot),
    })
}

pub fn storage_location(
    token_id: u64,
    chain_id: u64,
    contract: Address,
    slot: u64,
) -> IListRegistry::UpdateListStorageLocation {
    IListRegistry::UpdateListStorageLocation {
        tokenId: U256::from(token_id),
        listStorageLocation: storage_location_bytes(chain_id, contract, slot).into(),
    }
}

type Handler = Arc<dyn Fn(&str, &Value) -> Result<Value, String> + Send + Sync>;

/// Spawn a stub HTTP JSON-RPC server on a dynamic port. `handler` maps (method, params) to a
/// result or an error message. Each connection is served on its own thread.
pub fn spawn_rpc_stub<F>(handler: F) -> Result<String>
where
    F: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").context("bind stub")?;
    let url = format!("http://{}", listener.local_addr()?);
    let handler: Handler = Arc::new(handler);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let _ = serve_connection(stream, handler);
            });
        }
    });
    Ok(url)
}

fn serve_connection(mut stream: TcpStream, handler: Handler) -> Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let header_end = loop {
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body: Value = serde_json::from_slice(&buf[header_end..header_end + content_length])?;
        buf.drain(..header_end + content_length);

        let method = body["method"].as_str().unwrap_or_default().to_string();
        let response = match handler(&method, &body["params"]) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": body["id"], "result": result }),
            Err(message) => json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": -32000, "message": message }
            }),
        };
        let payload = serde_json::to_vec(&response)?;
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
            payload.len()
        );
        stream.write_all(head.as_bytes())?;
        stream.write_all(&payload)?;
        stream.flush()?;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a hex block tag from an eth_getLogs filter.
pub fn filter_block(filter: &Value, key: &str) -> u64 {
    filter[key]
        .as_str()
        .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
        .unwrap_or(0)
}
