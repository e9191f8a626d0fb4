//! Account activity: transaction lists, token transfers, and event logs.

use serde_json::{json, Value};

use chainscope_client::envelope::extract_result_list;
use chainscope_core::types::TokenType;

use crate::normalize::{
    normalize_block_range, normalize_sort, normalize_topics, DEFAULT_OFFSET, DEFAULT_PAGE,
};
use crate::{ContractService, ServiceError};

/// Block span per `eth_getLogs` request on the RPC path.
pub(crate) const LOG_CHUNK_BLOCKS: u64 = 2_000;

impl ContractService {
    /// Normal transactions for an address, via the explorer.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_transactions(
        &self,
        address: &str,
        network: Option<&str>,
        start_block: Option<&str>,
        end_block: Option<&str>,
        page: Option<u64>,
        offset: Option<u64>,
        sort: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let (start, end) = normalize_block_range(start_block, end_block)?;
        let page = page.unwrap_or(DEFAULT_PAGE);
        let offset = offset.unwrap_or(DEFAULT_OFFSET);
        let sort = normalize_sort(sort)?;

        let payload = self
            .client
            .transactions(&chain_id, &address, start, end, page, offset, &sort)
            .await?;
        let result = extract_result_list(&payload, false)?;
        let transactions: Vec<Value> =
            result.iter().filter(|tx| tx.is_object()).map(map_transaction).collect();

        Ok(json!({
            "address": address,
            "network": label,
            "chain_id": chain_id,
            "transactions": transactions,
            "page": page,
            "offset": offset,
            "sort": sort,
        }))
    }

    /// Token transfers (erc20 / erc721 / erc1155) for an address.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_token_transfers(
        &self,
        address: &str,
        network: Option<&str>,
        token_type: Option<&str>,
        start_block: Option<&str>,
        end_block: Option<&str>,
        page: Option<u64>,
        offset: Option<u64>,
        sort: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let token_type: TokenType = token_type.unwrap_or("erc20").parse()?;
        let (start, end) = normalize_block_range(start_block, end_block)?;
        let page = page.unwrap_or(DEFAULT_PAGE);
        let offset = offset.unwrap_or(DEFAULT_OFFSET);
        let sort = normalize_sort(sort)?;

        let payload = self
            .client
            .token_transfers(
                &chain_id,
                &address,
                token_type.action(),
                start,
                end,
                page,
                offset,
                &sort,
            )
            .await?;
        let result = extract_result_list(&payload, false)?;
        let transfers: Vec<Value> = result
            .iter()
            .filter(|t| t.is_object())
            .map(|t| map_token_transfer(t, token_type))
            .collect();

        Ok(json!({
            "address": address,
            "network": label,
            "chain_id": chain_id,
            "token_type": token_type.as_str(),
            "transfers": transfers,
            "page": page,
            "offset": offset,
            "sort": sort,
        }))
    }

    /// Event logs for an address: direct `eth_getLogs` over RPC when a URL
    /// is configured (chunked, then paginated against the concatenated
    /// result), otherwise the explorer's log endpoint.
    #[allow(clippy::too_many_arguments)]
    pub async fn query_logs(
        &self,
        address: &str,
        network: Option<&str>,
        topics: &[Option<String>],
        from_block: Option<&str>,
        to_block: Option<&str>,
        page: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let (from, to) = normalize_block_range(from_block, to_block)?;
        let page = page.unwrap_or(DEFAULT_PAGE);
        let offset = offset.unwrap_or(DEFAULT_OFFSET);
        let topic_params = normalize_topics(topics)?;

        let raw_logs = if let Some(url) = self.config.rpc_url_for(&chain_id) {
            let node = self.rpc_pool.get(url);
            let head = node.block_number().await?;
            let to = to.min(head);
            let topic_array = topics_rpc_array(&topic_params);

            let mut all = Vec::new();
            let mut start = from;
            while start <= to {
                let end = (start + LOG_CHUNK_BLOCKS - 1).min(to);
                let mut filter = json!({
                    "address": address,
                    "fromBlock": format!("{start:#x}"),
                    "toBlock": format!("{end:#x}"),
                });
                if let Some(topics) = &topic_array {
                    filter["topics"] = topics.clone();
                }
                let chunk = node.call("eth_getLogs", vec![filter]).await?;
                if let Some(list) = chunk.as_array() {
                    all.extend(list.iter().cloned());
                }
                start = end + 1;
            }
            paginate(all, page, offset)
        } else {
            let payload = self
                .client
                .logs(&chain_id, &address, from, to, &topic_params, page, offset)
                .await?;
            extract_result_list(&payload, false)?
        };

        let logs: Vec<Value> = raw_logs.iter().filter(|l| l.is_object()).map(map_log).collect();
        Ok(json!({
            "address": address,
            "network": label,
            "chain_id": chain_id,
            "logs": logs,
            "page": page,
            "offset": offset,
        }))
    }
}

/// `topic0..topic3` query parameters into the positional RPC topics array,
/// `null` for wildcard slots, trailing wildcards trimmed.
pub(crate) fn topics_rpc_array(params: &[(String, String)]) -> Option<Value> {
    if params.is_empty() {
        return None;
    }
    let mut slots = vec![Value::Null; 4];
    for (key, value) in params {
        if let Some(idx) = key.strip_prefix("topic").and_then(|i| i.parse::<usize>().ok()) {
            if idx < 4 {
                slots[idx] = json!(value);
            }
        }
    }
    while matches!(slots.last(), Some(Value::Null)) {
        slots.pop();
    }
    Some(Value::Array(slots))
}

/// Page slice of a concatenated result (page is 1-based).
pub(crate) fn paginate(items: Vec<Value>, page: u64, offset: u64) -> Vec<Value> {
    let start = (page.saturating_sub(1) * offset) as usize;
    items.into_iter().skip(start).take(offset as usize).collect()
}

pub(crate) fn map_transaction(tx: &Value) -> Value {
    json!({
        "hash": tx.get("hash"),
        "from": tx.get("from"),
        "to": tx.get("to"),
        "value": tx.get("value"),
        "gas": tx.get("gas"),
        "gas_price": tx.get("gasPrice"),
        "block_number": tx.get("blockNumber"),
        "timestamp": tx.get("timeStamp"),
        "input": tx.get("input"),
    })
}

pub(crate) fn map_token_transfer(transfer: &Value, token_type: TokenType) -> Value {
    let mut base = json!({
        "token_address": transfer.get("contractAddress").or_else(|| transfer.get("tokenAddress")),
        "token_symbol": transfer.get("tokenSymbol"),
        "from": transfer.get("from"),
        "to": transfer.get("to"),
        "tx_hash": transfer.get("hash"),
        "block_number": transfer.get("blockNumber"),
        "timestamp": transfer.get("timeStamp"),
        "token_type": token_type.as_str(),
    });
    let token_id = transfer.get("tokenID").or_else(|| transfer.get("tokenId"));
    match token_type {
        TokenType::Erc20 => {
            base["value"] = transfer.get("value").cloned().unwrap_or(Value::Null);
            base["decimals"] = transfer.get("tokenDecimal").cloned().unwrap_or(Value::Null);
        }
        TokenType::Erc721 => {
            base["token_id"] = token_id.cloned().unwrap_or(Value::Null);
        }
        TokenType::Erc1155 => {
            base["token_id"] = token_id.cloned().unwrap_or(Value::Null);
            base["value"] = transfer
                .get("tokenValue")
                .or_else(|| transfer.get("value"))
                .cloned()
                .unwrap_or(Value::Null);
        }
    }
    base
}

pub(crate) fn map_log(entry: &Value) -> Value {
    json!({
        "address": entry.get("address"),
        "topics": entry.get("topics"),
        "data": entry.get("data"),
        "block_number": entry.get("blockNumber"),
        "tx_hash": entry.get("transactionHash"),
        "log_index": entry.get("logIndex"),
        "time_stamp": entry.get("timeStamp"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_slices_concatenated_results() {
        let items: Vec<Value> = (0..10).map(|i| json!(i)).collect();
        assert_eq!(paginate(items.clone(), 1, 4), vec![json!(0), json!(1), json!(2), json!(3)]);
        assert_eq!(paginate(items.clone(), 3, 4), vec![json!(8), json!(9)]);
        assert!(paginate(items, 4, 4).is_empty());
    }

    #[test]
    fn topics_array_keeps_positions() {
        let params = vec![
            ("topic0".to_string(), "0xaa".to_string()),
            ("topic2".to_string(), "0xbb".to_string()),
        ];
        let array = topics_rpc_array(&params).unwrap();
        assert_eq!(array, json!(["0xaa", null, "0xbb"]));
        assert!(topics_rpc_array(&[]).is_none());
    }

    #[test]
    fn transaction_mapping_renames_fields() {
        let raw = json!({
            "hash": "0xh", "from": "0xf", "to": "0xt", "value": "1000",
            "gas": "21000", "gasPrice": "5", "blockNumber": "12", "timeStamp": "99",
            "input": "0x"
        });
        let mapped = map_transaction(&raw);
        assert_eq!(mapped["gas_price"], json!("5"));
        assert_eq!(mapped["block_number"], json!("12"));
        assert_eq!(mapped["timestamp"], json!("99"));
    }

    #[test]
    fn token_transfer_mapping_by_type() {
        let raw = json!({
            "contractAddress": "0xc", "tokenSymbol": "TKN", "from": "0xf", "to": "0xt",
            "hash": "0xh", "blockNumber": "1", "timeStamp": "2",
            "value": "100", "tokenDecimal": "18", "tokenID": "7", "tokenValue": "3"
        });
        let erc20 = map_token_transfer(&raw, TokenType::Erc20);
        assert_eq!(erc20["value"], json!("100"));
        assert_eq!(erc20["decimals"], json!("18"));
        assert!(erc20.get("token_id").is_none());

        let erc721 = map_token_transfer(&raw, TokenType::Erc721);
        assert_eq!(erc721["token_id"], json!("7"));

        let erc1155 = map_token_transfer(&raw, TokenType::Erc1155);
        assert_eq!(erc1155["token_id"], json!("7"));
        assert_eq!(erc1155["value"], json!("3"));
    }

    #[test]
    fn log_mapping_handles_rpc_shape() {
        let raw = json!({
            "address": "0xa", "topics": ["0x1"], "data": "0x",
            "blockNumber": "0x10", "transactionHash": "0xh", "logIndex": "0x0"
        });
        let mapped = map_log(&raw);
        assert_eq!(mapped["tx_hash"], json!("0xh"));
        assert_eq!(mapped["time_stamp"], Value::Null);
    }
}
