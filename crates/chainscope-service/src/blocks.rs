//! Transactions, receipts, and blocks via the explorer's proxy endpoints.

use serde_json::{json, Map, Value};

use chainscope_client::envelope::extract_proxy_result;
use chainscope_core::error::InputError;
use chainscope_core::hex::{normalize_tx_hash, parse_hex_u64};

use crate::normalize::normalize_block_tag;
use crate::{ContractService, ServiceError};

impl ContractService {
    /// Both the transaction object and its receipt, with the common hex
    /// quantities converted to integers.
    pub async fn get_transaction(
        &self,
        tx_hash: &str,
        network: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (label, chain_id) = self.resolve_network_and_chain(network).await?;
        let tx_hash = normalize_tx_hash(tx_hash)?;

        let tx_payload = self.client.transaction_by_hash(&chain_id, &tx_hash).await?;
        let tx_result = extract_proxy_result(&tx_payload, true)?;

        let receipt_payload = self.client.transaction_receipt(&chain_id, &tx_hash).await?;
        let receipt_result = extract_proxy_result(&receipt_payload, true)?;

        let transaction = match tx_result {
            Some(tx) => map_transaction_detail(&tx)?,
            None => Value::Null,
        };
        let receipt = match receipt_result {
            Some(receipt) => map_receipt(&receipt)?,
            None => Value::Null,
        };

        Ok(json!({
            "tx_hash": tx_hash,
            "network": label,
            "chain_id": chain_id,
            "transaction": transaction,
            "receipt": receipt,
        }))
    }

    /// A block by number or tag.
    ///
    /// `tx_hashes_only` reduces the transactions list to hashes even when
    /// the node returned full objects.
    pub async fn get_block(
        &self,
        block: &str,
        network: Option<&str>,
        full_transactions: bool,
        tx_hashes_only: bool,
    ) -> Result<Value, ServiceError> {
        let (label, chain_id) = self.resolve_network_and_chain(network).await?;
        let tag = normalize_block_tag(Some(block))?;

        let payload = self.client.block_by_number(&chain_id, &tag, full_transactions).await?;
        let mut block_obj = extract_proxy_result(&payload, true)?.unwrap_or(Value::Null);

        if tx_hashes_only {
            reduce_to_tx_hashes(&mut block_obj);
        }

        Ok(json!({
            "network": label,
            "chain_id": chain_id,
            "block_tag": tag,
            "block": block_obj,
        }))
    }

    /// A block's timestamp in raw, hex, and ISO-8601 UTC forms.
    pub async fn get_block_time(
        &self,
        block: &str,
        network: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (label, chain_id) = self.resolve_network_and_chain(network).await?;
        let tag = normalize_block_tag(Some(block))?;

        let payload = self.client.block_by_number(&chain_id, &tag, false).await?;
        let block_obj = extract_proxy_result(&payload, true)?.unwrap_or(Value::Null);

        let timestamp_hex = block_obj
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| InputError::other(format!("Block {tag} not found or has no timestamp.")))?;
        let timestamp = parse_hex_u64(&timestamp_hex)
            .ok_or_else(|| InputError::hex("timestamp"))?;
        let block_number = block_obj.get("number").and_then(Value::as_str).and_then(parse_hex_u64);

        Ok(json!({
            "network": label,
            "chain_id": chain_id,
            "block_tag": tag,
            "block_number": block_number,
            "timestamp": timestamp,
            "timestamp_hex": timestamp_hex,
            "timestamp_iso": iso_utc(timestamp)?,
        }))
    }
}

/// Unix seconds to `YYYY-MM-DDTHH:MM:SSZ` (UTC).
pub(crate) fn iso_utc(timestamp: u64) -> Result<String, ServiceError> {
    let datetime = chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .ok_or_else(|| InputError::other("timestamp out of range."))?;
    Ok(datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Replace full transaction objects with their hashes, in place.
pub(crate) fn reduce_to_tx_hashes(block: &mut Value) {
    let Some(transactions) = block.get_mut("transactions").and_then(Value::as_array_mut) else {
        return;
    };
    for tx in transactions.iter_mut() {
        if let Some(hash) = tx.get("hash").and_then(Value::as_str) {
            *tx = json!(hash);
        }
    }
}

/// Map `eth_getTransactionByHash` output, converting hex quantities.
pub(crate) fn map_transaction_detail(tx: &Value) -> Result<Value, ServiceError> {
    let mut out = Map::new();
    for key in ["hash", "from", "to", "value", "input", "v", "r", "s"] {
        out.insert(key.to_string(), tx.get(key).cloned().unwrap_or(Value::Null));
    }
    out.insert("block_hash".into(), tx.get("blockHash").cloned().unwrap_or(Value::Null));
    for (field, key) in [
        ("nonce", "nonce"),
        ("value", "value_int"),
        ("gas", "gas"),
        ("gasPrice", "gas_price"),
        ("maxFeePerGas", "max_fee_per_gas"),
        ("maxPriorityFeePerGas", "max_priority_fee_per_gas"),
        ("blockNumber", "block_number"),
        ("transactionIndex", "transaction_index"),
        ("type", "type"),
        ("chainId", "chain_id"),
    ] {
        out.insert(key.into(), hex_quantity(tx.get(field), field)?);
    }
    Ok(Value::Object(out))
}

/// Map `eth_getTransactionReceipt` output, converting hex quantities.
pub(crate) fn map_receipt(receipt: &Value) -> Result<Value, ServiceError> {
    let mut out = Map::new();
    out.insert(
        "contract_address".into(),
        receipt.get("contractAddress").cloned().unwrap_or(Value::Null),
    );
    out.insert("block_hash".into(), receipt.get("blockHash").cloned().unwrap_or(Value::Null));
    out.insert(
        "transaction_hash".into(),
        receipt.get("transactionHash").cloned().unwrap_or(Value::Null),
    );
    out.insert("logs".into(), receipt.get("logs").cloned().unwrap_or(Value::Null));
    for (field, key) in [
        ("status", "status"),
        ("cumulativeGasUsed", "cumulative_gas_used"),
        ("gasUsed", "gas_used"),
        ("effectiveGasPrice", "effective_gas_price"),
        ("blockNumber", "block_number"),
        ("transactionIndex", "transaction_index"),
    ] {
        out.insert(key.into(), hex_quantity(receipt.get(field), field)?);
    }
    Ok(Value::Object(out))
}

/// Convert an optional 0x-hex quantity to an integer JSON value: a number
/// when it fits 64 bits, a decimal string otherwise.
pub(crate) fn hex_quantity(value: Option<&Value>, field: &str) -> Result<Value, ServiceError> {
    let Some(text) = value.and_then(Value::as_str) else {
        return Ok(Value::Null);
    };
    let body = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InputError::hex(field).into());
    }
    match u64::from_str_radix(body, 16) {
        Ok(number) => Ok(json!(number)),
        Err(_) => {
            let wide = alloy_primitives::U256::from_str_radix(body, 16)
                .map_err(|_| InputError::hex(field))?;
            Ok(json!(wide.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_rendering() {
        assert_eq!(iso_utc(0).unwrap(), "1970-01-01T00:00:00Z");
        assert_eq!(iso_utc(1_700_000_000).unwrap(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn hex_quantities() {
        assert_eq!(hex_quantity(Some(&json!("0x10")), "gas").unwrap(), json!(16));
        assert_eq!(hex_quantity(None, "gas").unwrap(), Value::Null);
        // A wei amount wider than 64 bits becomes a decimal string.
        let wide = hex_quantity(Some(&json!("0xde0b6b3a76400000000")), "value").unwrap();
        assert_eq!(wide, json!("4096000000000000000000"));
        assert!(hex_quantity(Some(&json!("0xzz")), "gas").is_err());
    }

    #[test]
    fn transaction_detail_mapping() {
        let tx = json!({
            "hash": "0xh", "from": "0xf", "to": null, "value": "0xde0b6b3a7640000",
            "nonce": "0x1", "gas": "0x5208", "gasPrice": "0x3b9aca00",
            "blockHash": "0xbh", "blockNumber": "0x10", "transactionIndex": "0x0",
            "type": "0x2", "input": "0x", "chainId": "0x1",
            "v": "0x0", "r": "0xr", "s": "0xs"
        });
        let mapped = map_transaction_detail(&tx).unwrap();
        assert_eq!(mapped["gas"], json!(21000));
        assert_eq!(mapped["gas_price"], json!(1_000_000_000));
        assert_eq!(mapped["value"], json!("0xde0b6b3a7640000"));
        assert_eq!(mapped["value_int"], json!(1_000_000_000_000_000_000u64));
        assert_eq!(mapped["block_number"], json!(16));
        assert_eq!(mapped["chain_id"], json!(1));
        assert_eq!(mapped["max_fee_per_gas"], Value::Null);
        assert_eq!(mapped["to"], Value::Null);
    }

    #[test]
    fn receipt_mapping() {
        let receipt = json!({
            "status": "0x1", "contractAddress": null, "cumulativeGasUsed": "0xa",
            "gasUsed": "0x5", "effectiveGasPrice": "0x2", "blockHash": "0xbh",
            "blockNumber": "0x10", "transactionHash": "0xth", "transactionIndex": "0x3",
            "logs": []
        });
        let mapped = map_receipt(&receipt).unwrap();
        assert_eq!(mapped["status"], json!(1));
        assert_eq!(mapped["gas_used"], json!(5));
        assert_eq!(mapped["contract_address"], Value::Null);
        assert_eq!(mapped["logs"], json!([]));
    }

    #[test]
    fn tx_hash_reduction() {
        let mut block = json!({
            "number": "0x1",
            "transactions": [
                {"hash": "0xa", "from": "0xf"},
                {"hash": "0xb", "from": "0xg"}
            ]
        });
        reduce_to_tx_hashes(&mut block);
        assert_eq!(block["transactions"], json!(["0xa", "0xb"]));

        // already-hashes lists pass through untouched
        let mut hashes = json!({"transactions": ["0xa", "0xb"]});
        reduce_to_tx_hashes(&mut hashes);
        assert_eq!(hashes["transactions"], json!(["0xa", "0xb"]));
    }
}
