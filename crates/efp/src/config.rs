//! Sync configuration.
//!
//! Deployed ListRecords contracts and their start blocks are built in; RPC URLs and the
//! Base-only AccountMetadata / ListRegistry addresses come from the environment.

use crate::abi::parse_address;
use alloy::primitives::{address, Address};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Chains EFP is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chain {
    Ethereum,
    Optimism,
    Base,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Base, Chain::Optimism, Chain::Ethereum];

    pub fn id(self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Base => 8453,
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        Chain::ALL.into_iter().find(|c| c.id() == id)
    }

    /// Environment variable holding this chain's HTTP RPC URL.
    pub fn rpc_env(self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH_RPC_URL",
            Chain::Optimism => "OP_RPC_URL",
            Chain::Base => "BASE_RPC_URL",
        }
    }

    /// Deployed ListRecords contract.
    pub fn list_records(self) -> Address {
        match self {
            Chain::Ethereum => address!("5289fe5dabc021d02fddf23d4a4df96f4e0f17ef"),
            Chain::Optimism => address!("4ca00413d850dcfa3516e14d21dae2772f2acb85"),
            Chain::Base => address!("41aa48ef3c0446b46a5b1cc6337ff3d3716e2a33"),
        }
    }

    /// First block to backfill from (ListRecords deployment).
    pub fn start_block(self) -> u64 {
        match self {
            Chain::Ethereum => 20_820_743,
            Chain::Optimism => 125_792_735,
            Chain::Base => 20_197_200,
        }
    }
}

/// One chain to backfill.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain: Chain,
    /// HTTP RPC URL (eth_getLogs, eth_blockNumber, eth_call).
    pub http_url: String,
    pub list_records: Address,
    pub start_block: u64,
}

impl ChainConfig {
    pub fn new(chain: Chain, http_url: impl Into<String>) -> Self {
        Self {
            chain,
            http_url: http_url.into(),
            list_records: chain.list_records(),
            start_block: chain.start_block(),
        }
    }
}

/// Retry backoff for a failing block range.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

/// Fetch batching.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Max block range per eth_getLogs request.
    pub getlogs_max_range: u64,
    /// Max eth_getLogs requests in flight per source.
    pub concurrency: usize,
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            getlogs_max_range: 2000,
            concurrency: 4,
            retry: RetryConfig::default(),
        }
    }
}

/// Everything a full sync needs.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Chains with a configured RPC URL. Base is required.
    pub chains: Vec<ChainConfig>,
    /// AccountMetadata contract (Base).
    pub account_metadata: Address,
    /// ListRegistry contract (Base).
    pub registry: Address,
    /// Start block for the Base-only contracts.
    pub registry_start_block: u64,
    pub fetch: FetchConfig,
    pub output_path: PathBuf,
    /// Account the analysis demos report on.
    pub user_address: Option<Address>,
}

impl SyncConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let chains: Vec<ChainConfig> = Chain::ALL
            .into_iter()
            .filter_map(|chain| get(chain.rpc_env()).map(|url| ChainConfig::new(chain, url)))
            .collect();
        if !chains.iter().any(|c| c.chain == Chain::Base) {
            return Err(ConfigError::Missing(Chain::Base.rpc_env()));
        }

        let address = |name: &'static str| -> Result<Address, ConfigError> {
            let raw = get(name).ok_or(ConfigError::Missing(name))?;
            parse_address(raw.trim()).map_err(|e| ConfigError::Invalid(name, e.to_string()))
        };
        let account_metadata = address("ACCOUNT_METADATA_CONTRACT_ADDRESS")?;
        let registry = address("REGISTRY_CONTRACT_ADDRESS")?;
        let user_address = match get("USER_ADDRESS") {
            Some(_) => Some(address("USER_ADDRESS")?),
            None => None,
        };

        let mut fetch = FetchConfig::default();
        if let Some(v) = get("EFP_GETLOGS_MAX_RANGE") {
            fetch.getlogs_max_range = v
                .trim()
                .parse()
                .ok()
                .filter(|n: &u64| *n > 0)
                .ok_or(ConfigError::Invalid("EFP_GETLOGS_MAX_RANGE", v))?;
        }
        if let Some(v) = get("EFP_FETCH_CONCURRENCY") {
            fetch.concurrency = v
                .trim()
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or(ConfigError::Invalid("EFP_FETCH_CONCURRENCY", v))?;
        }
        let output_path = get("EFP_OUTPUT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("listOperations.json"));

        Ok(Self {
            chains,
            account_metadata,
            registry,
            registry_start_block: Chain::Base.start_block(),
            fetch,
            output_path,
            user_address,
        })
    }

    pub fn chain(&self, chain: Chain) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain == chain)
    }
}
