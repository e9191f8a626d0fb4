//! Thin typed wrappers over the Etherscan-compatible module/action surface.
//!
//! The client is immutable and shared: the chain id is an argument of every
//! call, never a field, so concurrent requests against different chains
//! cannot race.

use serde_json::Value;

use crate::error::ClientError;
use crate::http::{HttpEngine, RetryConfig};

/// Etherscan-compatible explorer API client.
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    engine: HttpEngine,
    base_url: String,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, config: RetryConfig) -> Self {
        Self {
            engine: HttpEngine::new("Etherscan", config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// `module=contract&action=getsourcecode`
    pub async fn contract_source(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<Value, ClientError> {
        self.request(chain_id, &[
            ("module", "contract"),
            ("action", "getsourcecode"),
            ("address", address),
        ])
        .await
    }

    /// `module=contract&action=getcontractcreation`
    pub async fn contract_creation(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<Value, ClientError> {
        self.request(chain_id, &[
            ("module", "contract"),
            ("action", "getcontractcreation"),
            ("contractaddresses", address),
        ])
        .await
    }

    /// `module=account&action=txlist`
    #[allow(clippy::too_many_arguments)]
    pub async fn transactions(
        &self,
        chain_id: &str,
        address: &str,
        start_block: u64,
        end_block: u64,
        page: u64,
        offset: u64,
        sort: &str,
    ) -> Result<Value, ClientError> {
        let start = start_block.to_string();
        let end = end_block.to_string();
        let page = page.to_string();
        let offset = offset.to_string();
        self.request(chain_id, &[
            ("module", "account"),
            ("action", "txlist"),
            ("address", address),
            ("startblock", &start),
            ("endblock", &end),
            ("page", &page),
            ("offset", &offset),
            ("sort", sort),
        ])
        .await
    }

    /// `module=account` with the action for the requested token class
    /// (`tokentx`, `tokennfttx`, `token1155tx`).
    #[allow(clippy::too_many_arguments)]
    pub async fn token_transfers(
        &self,
        chain_id: &str,
        address: &str,
        action: &str,
        start_block: u64,
        end_block: u64,
        page: u64,
        offset: u64,
        sort: &str,
    ) -> Result<Value, ClientError> {
        let start = start_block.to_string();
        let end = end_block.to_string();
        let page = page.to_string();
        let offset = offset.to_string();
        self.request(chain_id, &[
            ("module", "account"),
            ("action", action),
            ("address", address),
            ("startblock", &start),
            ("endblock", &end),
            ("page", &page),
            ("offset", &offset),
            ("sort", sort),
        ])
        .await
    }

    /// `module=logs&action=getLogs`
    #[allow(clippy::too_many_arguments)]
    pub async fn logs(
        &self,
        chain_id: &str,
        address: &str,
        from_block: u64,
        to_block: u64,
        topics: &[(String, String)],
        page: u64,
        offset: u64,
    ) -> Result<Value, ClientError> {
        let mut params = vec![
            ("module".to_string(), "logs".to_string()),
            ("action".to_string(), "getLogs".to_string()),
            ("address".to_string(), address.to_string()),
            ("fromBlock".to_string(), from_block.to_string()),
            ("toBlock".to_string(), to_block.to_string()),
            ("page".to_string(), page.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        for (key, value) in topics {
            params.push((key.clone(), value.clone()));
        }
        self.request_owned(chain_id, params).await
    }

    /// `module=proxy&action=eth_getTransactionByHash`
    pub async fn transaction_by_hash(
        &self,
        chain_id: &str,
        tx_hash: &str,
    ) -> Result<Value, ClientError> {
        self.request(chain_id, &[
            ("module", "proxy"),
            ("action", "eth_getTransactionByHash"),
            ("txhash", tx_hash),
        ])
        .await
    }

    /// `module=proxy&action=eth_getTransactionReceipt`
    pub async fn transaction_receipt(
        &self,
        chain_id: &str,
        tx_hash: &str,
    ) -> Result<Value, ClientError> {
        self.request(chain_id, &[
            ("module", "proxy"),
            ("action", "eth_getTransactionReceipt"),
            ("txhash", tx_hash),
        ])
        .await
    }

    /// `module=proxy&action=eth_getBlockByNumber`
    pub async fn block_by_number(
        &self,
        chain_id: &str,
        tag: &str,
        full_transactions: bool,
    ) -> Result<Value, ClientError> {
        let boolean = full_transactions.to_string();
        self.request(chain_id, &[
            ("module", "proxy"),
            ("action", "eth_getBlockByNumber"),
            ("tag", tag),
            ("boolean", &boolean),
        ])
        .await
    }

    /// `module=proxy&action=eth_getStorageAt`
    pub async fn storage_at(
        &self,
        chain_id: &str,
        address: &str,
        slot: &str,
        tag: &str,
    ) -> Result<Value, ClientError> {
        self.request(chain_id, &[
            ("module", "proxy"),
            ("action", "eth_getStorageAt"),
            ("address", address),
            ("position", slot),
            ("tag", tag),
        ])
        .await
    }

    /// `module=proxy&action=eth_call`
    pub async fn eth_call(
        &self,
        chain_id: &str,
        to: &str,
        data: &str,
        tag: &str,
    ) -> Result<Value, ClientError> {
        self.request(chain_id, &[
            ("module", "proxy"),
            ("action", "eth_call"),
            ("to", to),
            ("data", data),
            ("tag", tag),
        ])
        .await
    }

    /// Fetch the chain list from a dedicated endpoint (no chain id).
    pub async fn chainlist(&self, chainlist_url: &str) -> Result<Value, ClientError> {
        let params = vec![("apikey".to_string(), self.api_key.clone())];
        self.engine.get_json(chainlist_url, &params).await
    }

    async fn request(&self, chain_id: &str, params: &[(&str, &str)]) -> Result<Value, ClientError> {
        let owned = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.request_owned(chain_id, owned).await
    }

    async fn request_owned(
        &self,
        chain_id: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<Value, ClientError> {
        params.push(("chainid".to_string(), chain_id.to_string()));
        params.push(("apikey".to_string(), self.api_key.clone()));
        self.engine.get_json(&self.base_url, &params).await
    }
}
