//! Minimal JSON-RPC 2.0 client for EVM nodes, plus the lazy per-URL pool.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::ClientError;
use crate::http::{HttpEngine, RetryConfig};

/// JSON-RPC 2.0 client over HTTP POST with a monotonically increasing
/// request id per instance.
#[derive(Debug)]
pub struct RpcClient {
    url: String,
    engine: HttpEngine,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, config: RetryConfig) -> Self {
        Self {
            url: url.into(),
            engine: HttpEngine::new("RPC", config),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and return its `result`.
    ///
    /// An `error` object becomes an upstream failure whose detail joins
    /// `code`, `message`, and `data` (any present). Upstream failures are
    /// not retried; transport-level failures are, inside the engine.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let payload = self.engine.post_json(&self.url, &body).await?;
        let Some(object) = payload.as_object() else {
            return Err(ClientError::UnexpectedShape { backend: "RPC".into() });
        };

        if let Some(error) = object.get("error").and_then(Value::as_object) {
            let mut parts = Vec::new();
            if let Some(code) = error.get("code") {
                if !code.is_null() {
                    parts.push(format!("code {code}"));
                }
            }
            for key in ["message", "data"] {
                if let Some(text) = error.get(key).and_then(Value::as_str) {
                    if !text.is_empty() {
                        parts.push(text.to_string());
                    }
                }
            }
            let detail =
                if parts.is_empty() { "unknown error".to_string() } else { parts.join(": ") };
            return Err(ClientError::upstream("RPC", detail));
        }

        match object.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(ClientError::UnexpectedShape { backend: "RPC".into() }),
        }
    }

    /// `eth_blockNumber` as a u64.
    pub async fn block_number(&self) -> Result<u64, ClientError> {
        let result = self.call("eth_blockNumber", vec![]).await?;
        result
            .as_str()
            .and_then(chainscope_core::hex::parse_hex_u64)
            .ok_or_else(|| {
                ClientError::upstream("RPC", "eth_blockNumber returned unexpected result")
            })
    }

    /// `eth_getCode` at a block tag; returns the raw hex string.
    pub async fn get_code(&self, address: &str, tag: &str) -> Result<String, ClientError> {
        let result = self.call("eth_getCode", vec![json!(address), json!(tag)]).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::upstream("RPC", "eth_getCode returned unexpected result"))
    }
}

/// Lazily constructed, reused RPC clients, one per URL.
///
/// Insertions are race-safe: when two tasks race to create the same client,
/// the first insert wins and the loser's client is dropped.
#[derive(Debug, Default)]
pub struct RpcPool {
    clients: RwLock<HashMap<String, Arc<RpcClient>>>,
    config: RetryConfig,
}

impl RpcPool {
    pub fn new(config: RetryConfig) -> Self {
        Self { clients: RwLock::new(HashMap::new()), config }
    }

    /// The client for `url`, creating it on first use.
    pub fn get(&self, url: &str) -> Arc<RpcClient> {
        if let Some(client) = self.clients.read().unwrap().get(url) {
            return Arc::clone(client);
        }
        let mut clients = self.clients.write().unwrap();
        Arc::clone(
            clients
                .entry(url.to_string())
                .or_insert_with(|| Arc::new(RpcClient::new(url, self.config.clone()))),
        )
    }

    pub fn len(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reuses_clients() {
        let pool = RpcPool::new(RetryConfig::default());
        let a = pool.get("https://node.example");
        let b = pool.get("https://node.example");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
        pool.get("https://other.example");
        assert_eq!(pool.len(), 2);
    }
}
