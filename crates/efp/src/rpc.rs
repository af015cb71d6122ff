//! Minimal Ethereum JSON-RPC over HTTP.

use alloy::primitives::{Address, Bytes, B256, U64};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// `eth_getLogs` filter for one contract, matching any of `topic0s` in topic position 0.
pub fn build_logs_filter(
    address: &Address,
    topic0s: &[B256],
    from_block: Option<u64>,
    to_block: Option<u64>,
) -> Value {
    let mut filter = json!({
        "address": format!("0x{}", hex::encode(address)),
    });
    if !topic0s.is_empty() {
        let alternatives: Vec<String> = topic0s
            .iter()
            .map(|t| format!("0x{}", hex::encode(t)))
            .collect();
        filter["topics"] = json!([alternatives]);
    }
    if let Some(from) = from_block {
        filter["fromBlock"] = Value::String(format!("0x{:x}", from));
    }
    if let Some(to) = to_block {
        filter["toBlock"] = Value::String(format!("0x{:x}", to));
    }
    filter
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC `error` object.
#[derive(Debug, Deserialize, Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// POST one JSON-RPC request and decode `result` as `T`.
pub async fn request<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Value,
) -> Result<T> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": NEXT_ID.fetch_add(1, Ordering::Relaxed),
        "method": method,
        "params": params,
    });
    let resp: RpcResponse<T> = client
        .post(url)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("{} request failed", method))?
        .json()
        .await
        .with_context(|| format!("decode {} response", method))?;
    if let Some(err) = resp.error {
        return Err(err).context(method.to_string());
    }
    resp.result
        .ok_or_else(|| anyhow::anyhow!("{} response has no result", method))
}

pub async fn eth_block_number(client: &reqwest::Client, http_url: &str) -> Result<u64> {
    let tip: U64 = request(client, http_url, "eth_blockNumber", json!([])).await?;
    Ok(tip.to())
}

/// Raw log objects; decoding into events happens in [crate::event].
pub async fn eth_get_logs(
    client: &reqwest::Client,
    http_url: &str,
    filter: Value,
) -> Result<Vec<Value>> {
    request(client, http_url, "eth_getLogs", json!([filter])).await
}

/// `eth_call` against the latest block; returns the raw return data.
pub async fn eth_call(
    client: &reqwest::Client,
    http_url: &str,
    to: &Address,
    calldata: &[u8],
) -> Result<Bytes> {
    let params = json!([{
        "to": to,
        "data": Bytes::copy_from_slice(calldata),
    }, "latest"]);
    request(client, http_url, "eth_call", params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_with_topic_alternatives() {
        let addr = Address::from([0x11; 20]);
        let t0 = B256::repeat_byte(0xaa);
        let t1 = B256::repeat_byte(0xbb);
        let filter = build_logs_filter(&addr, &[t0, t1], Some(16), Some(31));
        assert_eq!(filter["address"], json!(format!("0x{}", "11".repeat(20))));
        assert_eq!(filter["fromBlock"], json!("0x10"));
        assert_eq!(filter["toBlock"], json!("0x1f"));
        let topics = filter["topics"][0].as_array().unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[1], json!(format!("0x{}", "bb".repeat(32))));
    }

    #[test]
    fn response_error_object_is_typed() {
        let resp: RpcResponse<U64> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32005, "message": "query returned more than 10000 results" }
        }))
        .unwrap();
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32005);
        assert_eq!(
            err.to_string(),
            "RPC error -32005: query returned more than 10000 results"
        );
    }

    #[test]
    fn response_result_decodes_quantity() {
        let resp: RpcResponse<U64> =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x13c6f0b" }))
                .unwrap();
        assert_eq!(resp.result.unwrap().to::<u64>(), 20_737_803);
    }

    #[test]
    fn filter_without_topics_or_range() {
        let filter = build_logs_filter(&Address::ZERO, &[], None, None);
        assert!(filter.get("topics").is_none());
        assert!(filter.get("fromBlock").is_none());
    }
}
