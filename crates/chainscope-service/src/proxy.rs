//! EIP-1967 proxy detection and storage reads.

use serde_json::{json, Value};

use chainscope_client::envelope::extract_proxy_result;
use chainscope_client::ClientError;
use chainscope_core::hex::{normalize_slot, storage_word_to_address};
use chainscope_core::types::ProxyRecord;

use crate::normalize::normalize_block_tag;
use crate::{ContractService, ServiceError};

/// EIP-1967 storage slots. Fixed by the standard; used verbatim.
pub const EIP1967_IMPLEMENTATION_SLOT: &str =
    "0x360894A13BA1A3210667C828492DB98DCA3E2076CC3735A920A3CA505D382BBC";
pub const EIP1967_ADMIN_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

impl ContractService {
    /// Read the EIP-1967 implementation and admin slots and synthesize a
    /// proxy record.
    pub async fn detect_proxy(
        &self,
        address: &str,
        network: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let record = self.detect_proxy_record(&address, &label, &chain_id).await?;
        Ok(serde_json::to_value(&record).expect("record serializes"))
    }

    pub(crate) async fn detect_proxy_record(
        &self,
        address: &str,
        network: &str,
        chain_id: &str,
    ) -> Result<ProxyRecord, ServiceError> {
        let impl_word = self
            .read_storage_word(chain_id, address, EIP1967_IMPLEMENTATION_SLOT, "latest")
            .await?;
        let admin_word =
            self.read_storage_word(chain_id, address, EIP1967_ADMIN_SLOT, "latest").await?;

        let implementation = storage_word_to_address(&impl_word)?;
        let admin = storage_word_to_address(&admin_word)?;

        let mut evidence = Vec::new();
        if implementation.is_some() {
            evidence.push(format!(
                "implementation slot {EIP1967_IMPLEMENTATION_SLOT} -> {impl_word}"
            ));
        }
        if admin.is_some() {
            evidence.push(format!("admin slot {EIP1967_ADMIN_SLOT} -> {admin_word}"));
        }

        let is_proxy = implementation.is_some() || admin.is_some();
        let record = ProxyRecord {
            address: address.to_string(),
            network: network.to_string(),
            chain_id: chain_id.to_string(),
            is_proxy,
            implementation,
            admin,
            proxy_type: is_proxy.then(|| "eip1967".to_string()),
            evidence,
        };
        self.proxies.set(chain_id, address, record.clone());
        Ok(record)
    }

    /// Read one storage word, as a hex string.
    pub async fn get_storage_at(
        &self,
        address: &str,
        slot: &str,
        network: Option<&str>,
        block_tag: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let slot = normalize_slot(slot)?;
        let tag = normalize_block_tag(block_tag)?;

        let word = self.read_storage_word(&chain_id, &address, &slot, &tag).await?;
        Ok(json!({
            "address": address,
            "network": label,
            "chain_id": chain_id,
            "slot": slot,
            "data": word,
            "block_tag": tag,
        }))
    }

    /// `eth_getStorageAt` via the chain's RPC URL when configured, else the
    /// explorer's proxy endpoint.
    pub(crate) async fn read_storage_word(
        &self,
        chain_id: &str,
        address: &str,
        slot: &str,
        tag: &str,
    ) -> Result<String, ServiceError> {
        if let Some(url) = self.config.rpc_url_for(chain_id) {
            let node = self.rpc_pool.get(url);
            let result = node
                .call("eth_getStorageAt", vec![json!(address), json!(slot), json!(tag)])
                .await?;
            return result.as_str().map(str::to_string).ok_or_else(|| {
                ClientError::upstream("RPC", "eth_getStorageAt returned unexpected result").into()
            });
        }

        let payload = self.client.storage_at(chain_id, address, slot, tag).await?;
        let result = extract_proxy_result(&payload, false)?
            .ok_or(ClientError::UnexpectedShape { backend: "Etherscan".into() })?;
        result.as_str().map(str::to_string).ok_or_else(|| {
            ClientError::UnexpectedShape { backend: "Etherscan".into() }.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_constants_are_words() {
        assert_eq!(EIP1967_IMPLEMENTATION_SLOT.len(), 66);
        assert_eq!(EIP1967_ADMIN_SLOT.len(), 66);
    }

    #[test]
    fn nonzero_word_maps_to_low_20_bytes() {
        let word = format!("0x{}{}", "0".repeat(24), "de".repeat(20));
        let addr = storage_word_to_address(&word).unwrap().unwrap();
        assert_eq!(addr, format!("0x{}", "de".repeat(20)));
    }
}
