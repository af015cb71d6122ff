//! `eth_call` views on the EFP contracts.

use crate::abi::{IAccountMetadata, IListRecords, IListRegistry};
use crate::codec::{decode_storage_location, ListStorageLocation};
use crate::resolver::PRIMARY_LIST_KEY;
use crate::rpc::eth_call;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};

/// Read-only client for one chain's EFP contracts.
#[derive(Debug, Clone)]
pub struct ListReader {
    client: reqwest::Client,
    http_url: String,
}

impl ListReader {
    pub fn new(http_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            http_url: http_url.into(),
        }
    }

    async fn call<C: SolCall>(&self, to: &Address, call: C) -> Result<C::Return> {
        let data = eth_call(&self.client, &self.http_url, to, &call.abi_encode()).await?;
        C::abi_decode_returns_validate(&data).with_context(|| format!("decode {} return", C::SIGNATURE))
    }

    /// Primary list token of `account`, `None` if unset.
    pub async fn primary_list(&self, account_metadata: &Address, account: Address) -> Result<Option<U256>> {
        let ret = self
            .call(
                account_metadata,
                IAccountMetadata::getValueCall {
                    addr: account,
                    key: PRIMARY_LIST_KEY.to_string(),
                },
            )
            .await?;
        let value: Bytes = ret;
        if value.is_empty() {
            return Ok(None);
        }
        U256::try_from_be_slice(&value)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("primary-list value wider than 256 bits"))
    }

    /// Storage location of list `token_id`; the sentinel when unset or malformed.
    pub async fn list_storage_location(&self, registry: &Address, token_id: U256) -> Result<ListStorageLocation> {
        let ret = self
            .call(registry, IListRegistry::getListStorageLocationCall { tokenId: token_id })
            .await?;
        Ok(decode_storage_location(&ret))
    }

    pub async fn list_user(&self, list_records: &Address, slot: U256) -> Result<Address> {
        let ret = self
            .call(list_records, IListRecords::getListUserCall { slot })
            .await?;
        Ok(ret)
    }

    /// Every op ever appended to `slot`, in append order.
    pub async fn all_list_ops(&self, list_records: &Address, slot: U256) -> Result<Vec<Bytes>> {
        let ret = self
            .call(list_records, IListRecords::getAllListOpsCall { slot })
            .await?;
        Ok(ret)
    }
}
