//! Batched `eth_getLogs` backfill.
//!
//! A [LogSource] is split into block ranges that are fetched with at most
//! `concurrency` requests in flight. Failing ranges are retried with jittered
//! exponential backoff; a range that keeps failing is skipped with a warning, so the
//! result may be incomplete but is never partially-ordered.

use crate::config::{FetchConfig, RetryConfig};
use crate::event::{normalize_logs, Event};
use crate::range::BlockRange;
use crate::rpc::{build_logs_filter, eth_block_number, eth_get_logs};
use alloy::primitives::{Address, B256};
use anyhow::Result;
use futures_util::stream::{self, StreamExt};
use rand::Rng;
use serde_json::Value;
use tokio::time::{sleep, Duration};

/// One contract's events on one chain.
#[derive(Debug, Clone)]
pub struct LogSource {
    pub name: &'static str,
    pub chain_id: u64,
    pub http_url: String,
    pub address: Address,
    /// Event signature hashes to match (OR).
    pub topic0s: Vec<B256>,
    pub start_block: u64,
}

/// Fetches and orders logs for [LogSource]s.
#[derive(Debug, Clone)]
pub struct LogFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl LogFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: FetchConfig) -> Self {
        Self { client, config }
    }

    /// Raw logs for `source` from its start block to the current tip, sorted by
    /// (block_number, log_index).
    pub async fn fetch(&self, source: &LogSource) -> Result<Vec<Value>> {
        let tip = eth_block_number(&self.client, &source.http_url).await?;
        self.fetch_range(source, source.start_block, tip).await
    }

    /// Raw logs for `source` in `[from, to]`.
    pub async fn fetch_range(&self, source: &LogSource, from: u64, to: u64) -> Result<Vec<Value>> {
        let ranges = BlockRange::split(from, to, self.config.getlogs_max_range);
        tracing::info!(
            source = source.name,
            chain_id = source.chain_id,
            from,
            to,
            batches = ranges.len(),
            "fetching logs"
        );
        let batches: Vec<Vec<Value>> = stream::iter(ranges)
            .map(|range| self.fetch_batch(source, range))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut logs: Vec<(u64, u64, Value)> = batches
            .into_iter()
            .flatten()
            .filter_map(|log| {
                let key = log_order_key(&log)?;
                Some((key.0, key.1, log))
            })
            .collect();
        logs.sort_by_key(|(block, index, _)| (*block, *index));
        tracing::info!(source = source.name, chain_id = source.chain_id, count = logs.len(), "fetched logs");
        Ok(logs.into_iter().map(|(_, _, log)| log).collect())
    }

    /// Fetch and normalize `source` into events.
    pub async fn fetch_events(&self, source: &LogSource) -> Result<Vec<Event>> {
        let logs = self.fetch(source).await?;
        Ok(normalize_logs(source.chain_id, &logs))
    }

    async fn fetch_batch(&self, source: &LogSource, range: BlockRange) -> Vec<Value> {
        let retry = &self.config.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let filter = build_logs_filter(
                &source.address,
                &source.topic0s,
                Some(range.from),
                Some(range.to),
            );
            match eth_get_logs(&self.client, &source.http_url, filter).await {
                Ok(logs) => {
                    tracing::debug!(
                        source = source.name,
                        from = range.from,
                        to = range.to,
                        count = logs.len(),
                        "batch fetched"
                    );
                    return logs;
                }
                Err(e) if attempt < retry.max_attempts => {
                    let delay = backoff(retry, attempt);
                    tracing::debug!(
                        source = source.name,
                        from = range.from,
                        to = range.to,
                        attempt,
                        reason = %e,
                        "eth_getLogs failed, retrying in {:?}",
                        delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(
                        source = source.name,
                        chain_id = source.chain_id,
                        from = range.from,
                        to = range.to,
                        reason = %e,
                        "eth_getLogs failed, skipping range"
                    );
                    return Vec::new();
                }
            }
        }
    }
}

/// Exponential backoff for `attempt` (1-based) capped at `max_backoff_ms`, plus up to 25% jitter.
fn backoff(retry: &RetryConfig, attempt: u32) -> Duration {
    let exp = retry
        .initial_backoff_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
    let base = exp.min(retry.max_backoff_ms);
    let jitter = if base >= 4 {
        rand::thread_rng().gen_range(0..base / 4)
    } else {
        0
    };
    Duration::from_millis(base + jitter)
}

fn log_order_key(log: &Value) -> Option<(u64, u64)> {
    let hex_field = |name: &str| {
        let s = log.get(name)?.as_str()?;
        u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok()
    };
    match (hex_field("blockNumber"), hex_field("logIndex")) {
        (Some(block), Some(index)) => Some((block, index)),
        _ => {
            tracing::warn!("dropping log without blockNumber/logIndex");
            None
        }
    }
}
