//! Contract creation provenance: explorer lookup with RPC fallback.
//!
//! When the explorer has no creation record, a binary search over
//! historical `eth_getCode` locates the deployment block, and the block's
//! transactions are scanned for the one whose receipt created the target.

use async_trait::async_trait;
use serde_json::{json, Value};

use chainscope_client::{ClientError, RpcClient};
use chainscope_core::hex::parse_hex_u64;
use chainscope_core::types::{CreationRecord, CreationSource};

use crate::{ContractService, ServiceError};

/// The node surface the fallback needs. Kept narrow so tests can script a
/// chain's history.
#[async_trait]
pub(crate) trait NodeView: Send + Sync {
    async fn block_number(&self) -> Result<u64, ClientError>;
    async fn get_code(&self, address: &str, tag: &str) -> Result<String, ClientError>;
    async fn block_by_number(&self, tag: &str, full: bool) -> Result<Value, ClientError>;
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Value, ClientError>;
}

#[async_trait]
impl NodeView for RpcClient {
    async fn block_number(&self) -> Result<u64, ClientError> {
        RpcClient::block_number(self).await
    }

    async fn get_code(&self, address: &str, tag: &str) -> Result<String, ClientError> {
        RpcClient::get_code(self, address, tag).await
    }

    async fn block_by_number(&self, tag: &str, full: bool) -> Result<Value, ClientError> {
        self.call("eth_getBlockByNumber", vec![json!(tag), json!(full)]).await
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Value, ClientError> {
        self.call("eth_getTransactionReceipt", vec![json!(tx_hash)]).await
    }
}

impl ContractService {
    /// Creation provenance for a contract, cached per (chain, address).
    pub async fn get_contract_creation(
        &self,
        address: &str,
        network: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;

        if let Some(cached) = self.creations.get(&chain_id, &address) {
            tracing::debug!(address = %address, chain_id = %chain_id, "creation cache hit");
            return Ok(serde_json::to_value(&cached).expect("record serializes"));
        }

        let record = match self.creation_via_explorer(&address, &label, &chain_id).await {
            Ok(record) => record,
            Err(explorer_err) => {
                let Some(url) = self.config.rpc_url_for(&chain_id) else {
                    return Err(explorer_err);
                };
                tracing::debug!(
                    address = %address,
                    chain_id = %chain_id,
                    error = %explorer_err,
                    "explorer creation lookup failed; falling back to RPC"
                );
                let node = self.rpc_pool.get(url);
                creation_via_rpc(node.as_ref(), &address, &label, &chain_id).await?
            }
        };

        self.creations.set(&chain_id, &address, record.clone());
        Ok(serde_json::to_value(&record).expect("record serializes"))
    }

    async fn creation_via_explorer(
        &self,
        address: &str,
        network: &str,
        chain_id: &str,
    ) -> Result<CreationRecord, ServiceError> {
        let payload = self.client.contract_creation(chain_id, address).await?;
        let result =
            chainscope_client::envelope::extract_result_list(&payload, true)?;
        let entry = result
            .first()
            .ok_or(ClientError::EmptyResult { backend: "Etherscan".into() })?;

        let field = |keys: &[&str]| -> String {
            keys.iter()
                .filter_map(|key| entry.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .next()
                .unwrap_or_default()
        };

        let creator = field(&["contractCreator", "ContractCreator"]);
        let tx_hash = field(&["txHash", "TxHash"]);
        let block_number = field(&["blockNumber", "BlockNumber"]);
        let timestamp = {
            let raw = field(&["timeStamp", "timestamp"]);
            (!raw.is_empty()).then_some(raw)
        };
        let complete = !creator.is_empty() && !tx_hash.is_empty();

        Ok(CreationRecord {
            address: address.to_string(),
            network: network.to_string(),
            chain_id: chain_id.to_string(),
            creator,
            tx_hash,
            block_number,
            timestamp,
            source: CreationSource::Etherscan,
            complete,
        })
    }
}

fn code_is_empty(code: &str) -> bool {
    matches!(code.trim(), "" | "0x" | "0x0")
}

/// Reconstruct creation provenance from the node alone.
///
/// Binary search finds the smallest block at which `eth_getCode` is
/// non-empty; the block's transactions are scanned for a deployment whose
/// receipt's `contractAddress` matches (case-insensitive). A missing
/// deployment transaction is non-fatal and reported as `complete: false`.
pub(crate) async fn creation_via_rpc(
    node: &dyn NodeView,
    address: &str,
    network: &str,
    chain_id: &str,
) -> Result<CreationRecord, ServiceError> {
    let latest_code = node.get_code(address, "latest").await?;
    if code_is_empty(&latest_code) {
        return Err(ServiceError::NoCode { address: address.to_string() });
    }

    let head = node.block_number().await?;
    let mut lo = 0u64;
    let mut hi = head;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let code = node
            .get_code(address, &format!("{mid:#x}"))
            .await
            .map_err(|err| ServiceError::ArchiveRequired { detail: err.to_string() })?;
        if code_is_empty(&code) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let deploy_block = lo;

    let block = node.block_by_number(&format!("{deploy_block:#x}"), true).await?;
    let timestamp = block
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_hex_u64)
        .map(|t| t.to_string());

    let mut creator = String::new();
    let mut tx_hash = String::new();
    if let Some(transactions) = block.get("transactions").and_then(Value::as_array) {
        for tx in transactions {
            if !tx.get("to").map(Value::is_null).unwrap_or(false) {
                continue;
            }
            let Some(hash) = tx.get("hash").and_then(Value::as_str) else { continue };
            let receipt = match node.transaction_receipt(hash).await {
                Ok(receipt) => receipt,
                Err(_) => continue,
            };
            let created = receipt.get("contractAddress").and_then(Value::as_str).unwrap_or("");
            if created.eq_ignore_ascii_case(address) {
                creator = tx.get("from").and_then(Value::as_str).unwrap_or("").to_ascii_lowercase();
                tx_hash = hash.to_ascii_lowercase();
                break;
            }
        }
    }

    let complete = !creator.is_empty() && !tx_hash.is_empty();
    Ok(CreationRecord {
        address: address.to_string(),
        network: network.to_string(),
        chain_id: chain_id.to_string(),
        creator,
        tx_hash,
        block_number: deploy_block.to_string(),
        timestamp,
        source: CreationSource::Rpc,
        complete,
    })
}
