//! The Chainscope service orchestrator.
//!
//! One [`ContractService`] instance is shared across concurrent
//! invocations. It owns the caches, the chain registry, the explorer
//! client, and the lazy RPC pool; per-invocation state stays on the stack.
//! Every operation runs the same pipeline: normalize inputs, resolve the
//! chain, check the cache, pick a backend, map the raw payload into a
//! stable shape.

pub mod blocks;
pub mod calls;
pub mod contract;
pub mod convert;
pub mod creation;
pub mod error;
pub mod hash;
pub mod history;
pub mod normalize;
pub mod proxy;

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use chainscope_client::{EtherscanClient, RetryConfig, RpcPool};
use chainscope_core::types::{ContractRecord, CreationRecord, ProxyRecord};
use chainscope_core::{Config, RecordCache};
use chainscope_registry::ChainRegistry;

pub use error::ServiceError;

/// The contract-inspection service.
pub struct ContractService {
    config: Config,
    registry: ChainRegistry,
    client: Arc<EtherscanClient>,
    rpc_pool: RpcPool,
    contracts: RecordCache<ContractRecord>,
    creations: RecordCache<CreationRecord>,
    proxies: RecordCache<ProxyRecord>,
}

impl ContractService {
    pub fn new(config: Config) -> Self {
        let retry = RetryConfig {
            timeout: Duration::from_secs(config.request_timeout),
            max_retries: config.max_retries,
            backoff: Duration::from_secs_f64(config.backoff_seconds),
        };
        let client = Arc::new(EtherscanClient::new(
            config.api_key.as_str(),
            config.base_url.as_str(),
            retry.clone(),
        ));
        let registry = ChainRegistry::new(
            Arc::clone(&client) as Arc<dyn chainscope_registry::ChainlistSource>,
            config.chainlist_url.as_str(),
            Duration::from_secs(config.chainlist_ttl_seconds),
        );
        Self {
            config,
            registry,
            client,
            rpc_pool: RpcPool::new(retry),
            contracts: RecordCache::new(),
            creations: RecordCache::new(),
            proxies: RecordCache::new(),
        }
    }

    /// Construct from environment variables.
    pub fn from_env() -> Result<Self, ServiceError> {
        Ok(Self::new(Config::from_env()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// List known chains, ordered by numeric chain id ascending.
    pub async fn list_chains(&self, include_degraded: bool) -> Result<Value, ServiceError> {
        let chains = self.registry.list_chains(include_degraded).await?;
        Ok(serde_json::json!({
            "count": chains.len(),
            "chains": chains,
        }))
    }

    /// Resolve a network argument without performing any other operation.
    pub async fn resolve_network(&self, network: &str) -> Result<Value, ServiceError> {
        let resolved = self.registry.resolve(network).await?;
        Ok(serde_json::to_value(&resolved).expect("resolution serializes"))
    }
}
