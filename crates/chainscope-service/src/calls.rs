//! Read-only function calls: call data preparation, proxy-aware selector
//! resolution, and output decoding.
//!
//! When both the proxy contract and its implementation have known ABIs,
//! the implementation's ABI takes precedence for selector resolution; it
//! is what actually runs behind a delegatecall.

use serde_json::{json, Value};
use std::collections::HashMap;

use chainscope_abi::{functions_by_selector, AbiFunction};
use chainscope_client::envelope::extract_proxy_result;
use chainscope_client::ClientError;
use chainscope_core::error::InputError;
use chainscope_core::hex::{hex_to_bytes, normalize_address, normalize_hex};

use crate::contract::proxy_info_from_contract;
use crate::convert::format_scaled_digits;
use crate::normalize::normalize_block_tag;
use crate::{ContractService, ServiceError};

/// What is known about the function behind the call data.
#[derive(Debug, Default)]
pub(crate) struct FuncMeta {
    pub selector: String,
    pub name: Option<String>,
    pub signature: Option<String>,
    /// `provided`, `contract`, or `implementation`.
    pub source: Option<String>,
    pub entry: Option<AbiFunction>,
    pub warning: Option<String>,
}

impl ContractService {
    /// Encode call data for a function signature without touching the
    /// network.
    pub fn encode_function_data(
        &self,
        function: &str,
        args: &[Value],
    ) -> Result<Value, ServiceError> {
        let (selector, data) = chainscope_abi::encode_function_data(function, args)?;
        Ok(json!({"function": function, "selector": selector, "data": data}))
    }

    /// Execute a read-only call and decode the result against the best
    /// available ABI.
    #[allow(clippy::too_many_arguments)]
    pub async fn call_function(
        &self,
        address: &str,
        network: Option<&str>,
        data: Option<&str>,
        function: Option<&str>,
        args: Option<&[Value]>,
        block_tag: Option<&str>,
        decimals: Option<&Value>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let (call_data, meta) = self
            .prepare_call_data(data, function, args, &address, &label, &chain_id)
            .await?;
        let tag = normalize_block_tag(block_tag)?;

        let result_hex = if let Some(url) = self.config.rpc_url_for(&chain_id) {
            let node = self.rpc_pool.get(url);
            let result = node
                .call("eth_call", vec![json!({"to": address, "data": call_data}), json!(tag)])
                .await?;
            result.as_str().map(str::to_string).ok_or_else(|| {
                ClientError::upstream("RPC", "eth_call returned unexpected result")
            })?
        } else {
            let payload = self.client.eth_call(&chain_id, &address, &call_data, &tag).await?;
            extract_proxy_result(&payload, false)?
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or(ClientError::UnexpectedShape { backend: "Etherscan".into() })?
        };

        let decoded = decode_call_result(&result_hex, &meta, decimals);

        let mut response = json!({
            "address": address,
            "network": label,
            "chain_id": chain_id,
            "block_tag": tag,
            "data": result_hex,
            "decoded": decoded,
        });
        if let Some(function) = function {
            response["function"] = json!(function);
        }
        if let Some(args) = args {
            response["args"] = json!(args);
        }
        Ok(response)
    }

    /// Build or normalize call data, then resolve the selector against the
    /// cached ABIs of the target and (when relevant) its implementation.
    pub(crate) async fn prepare_call_data(
        &self,
        data: Option<&str>,
        function: Option<&str>,
        args: Option<&[Value]>,
        address: &str,
        network: &str,
        chain_id: &str,
    ) -> Result<(String, FuncMeta), ServiceError> {
        let mut meta = FuncMeta::default();

        let normalized = match function {
            Some(function) => {
                if data.is_some() {
                    return Err(ServiceError::ConflictingCallInput);
                }
                let signature = chainscope_abi::parse_signature(function)?;
                let (selector, encoded) =
                    chainscope_abi::encode_function_data(function, args.unwrap_or(&[]))?;
                meta.selector = selector;
                meta.name = Some(signature.name.clone());
                meta.signature = Some(signature.canonical());
                meta.source = Some("provided".to_string());
                encoded
            }
            None => {
                let data = data.ok_or(ServiceError::MissingCallInput)?;
                let normalized = normalize_hex(data, "data")?;
                if normalized.len() < 10 {
                    return Err(ServiceError::ShortCallData);
                }
                meta.selector = normalized[2..10].to_string();
                normalized
            }
        };
        let selector = normalized[2..10].to_string();

        // Selector maps in preference order; the implementation's ABI, when
        // known, is inserted at the front.
        let mut maps: Vec<(HashMap<String, AbiFunction>, &'static str)> = Vec::new();
        let mut loaded_impl: Option<String> = None;

        let contract = self.contract_record_soft(address, network, chain_id).await;
        let mut proxy_info = contract.as_ref().and_then(proxy_info_from_contract);
        if let Some(record) = &contract {
            let map = functions_by_selector(&record.abi);
            if !map.is_empty() {
                maps.push((map, "contract"));
            }
            if let Some(hint) = record.implementation.clone() {
                if hint != address {
                    if let Some(impl_record) =
                        self.contract_record_soft(&hint, network, chain_id).await
                    {
                        let map = functions_by_selector(&impl_record.abi);
                        if !map.is_empty() {
                            maps.insert(0, (map, "implementation"));
                            loaded_impl = Some(hint);
                        }
                    }
                }
            }
        }

        // If the selector is still unknown, probe the EIP-1967 slots for an
        // implementation whose ABI might cover it.
        let known = maps.iter().any(|(map, _)| map.contains_key(&selector));
        if !known {
            if proxy_info.is_none() {
                proxy_info = self.proxies.get(chain_id, address);
            }
            let needs_detect = match &proxy_info {
                None => true,
                Some(info) => info.is_proxy && info.implementation.is_none(),
            };
            if needs_detect {
                proxy_info = self.detect_proxy_record(address, network, chain_id).await.ok();
            }

            if let Some(info) = &proxy_info {
                if info.is_proxy {
                    if let Some(impl_addr) =
                        info.implementation.as_deref().and_then(|a| normalize_address(a).ok())
                    {
                        if impl_addr != address && Some(&impl_addr) != loaded_impl.as_ref() {
                            if let Some(impl_record) =
                                self.contract_record_soft(&impl_addr, network, chain_id).await
                            {
                                let map = functions_by_selector(&impl_record.abi);
                                if !map.is_empty() {
                                    maps.insert(0, (map, "implementation"));
                                }
                            }
                        }
                    }
                }
            }
        }

        let available_any = !maps.is_empty();
        for (map, source) in &maps {
            let Some(entry) = map.get(&selector) else { continue };

            // Head-length check: the call data must at least cover the
            // static portion of the declared inputs.
            if let Ok(static_size) = entry.static_input_size() {
                let min_length = 10 + static_size * 2;
                if normalized.len() < min_length {
                    return Err(ServiceError::CallDataTooShort {
                        name: entry.name.clone(),
                        expected: min_length - 2,
                    });
                }
            }

            meta.name = Some(entry.name.clone());
            meta.signature = Some(entry.signature());
            meta.source = Some(source.to_string());
            meta.entry = Some(entry.clone());
            return Ok((normalized, meta));
        }

        if available_any {
            meta.warning = Some(format!(
                "Function selector 0x{selector} not found in cached ABI; returning raw result."
            ));
        }
        Ok((normalized, meta))
    }

    /// Contract record lookup that swallows failures; ABI resolution is
    /// best-effort and never blocks the call itself.
    async fn contract_record_soft(
        &self,
        address: &str,
        network: &str,
        chain_id: &str,
    ) -> Option<chainscope_core::types::ContractRecord> {
        if let Some(cached) = self.contracts.get(chain_id, address) {
            return Some(cached);
        }
        match self.fetch_contract_record(address, network, chain_id).await {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!(address, chain_id, error = %err, "ABI lookup failed");
                None
            }
        }
    }
}

/// Decode a call result against the resolved function's outputs.
///
/// Decoding problems populate `decoded.error`; they never fail the call.
pub(crate) fn decode_call_result(
    result_hex: &str,
    meta: &FuncMeta,
    decimals_hint: Option<&Value>,
) -> Value {
    let selector = if meta.selector.is_empty() {
        Value::Null
    } else {
        json!(format!("0x{}", meta.selector))
    };
    let mut decoded = json!({
        "ok": false,
        "error": Value::Null,
        "selector": selector,
        "function_name": &meta.name,
        "function_signature": &meta.signature,
        "source": &meta.source,
        "outputs": [],
        "warning": &meta.warning,
    });

    let Some(entry) = &meta.entry else {
        decoded["error"] = json!("ABI not available for decoding.");
        return decoded;
    };

    if entry.outputs.is_empty() {
        decoded["ok"] = json!(true);
        return decoded;
    }

    let result = (|| -> Result<Vec<Value>, ServiceError> {
        let params = entry.output_params()?;
        let bytes = hex_to_bytes(result_hex, "result")?;
        let values = chainscope_abi::decode_params(&params, &bytes)?;
        let cfg = parse_decimals_hint(decimals_hint)?;

        let mut items = Vec::with_capacity(values.len());
        for (idx, (output, value)) in entry.outputs.iter().zip(values.iter()).enumerate() {
            let name = if output.name.is_empty() {
                format!("output{idx}")
            } else {
                output.name.clone()
            };
            let mut item = json!({
                "name": name,
                "type": output.ty,
                "value": value,
            });
            if let Some(digits) = numeric_magnitude(value) {
                if let Some(dec) = cfg.select(&name, idx) {
                    item["decimals"] = json!(dec);
                    item["value_scaled"] = json!(scale_digits(&digits, dec));
                }
            }
            items.push(item);
        }
        Ok(items)
    })();

    match result {
        Ok(items) => {
            decoded["outputs"] = json!(items);
            decoded["ok"] = json!(true);
        }
        Err(err) => {
            decoded["error"] = json!(format!("Failed to decode result: {err}"));
        }
    }
    decoded
}

/// Signed decimal digits of a numeric ABI value, `None` otherwise.
fn numeric_magnitude(value: &chainscope_abi::AbiValue) -> Option<String> {
    use chainscope_abi::AbiValue;
    match value {
        AbiValue::Uint(v) => Some(v.to_string()),
        AbiValue::Int(v) => Some(v.to_string()),
        _ => None,
    }
}

fn scale_digits(signed_digits: &str, decimals: u32) -> String {
    match signed_digits.strip_prefix('-') {
        Some(magnitude) => format!("-{}", format_scaled_digits(magnitude, decimals)),
        None => format_scaled_digits(signed_digits, decimals),
    }
}

/// Parsed `decimals` hint: a global value, per-name, or per-index.
#[derive(Debug, Default)]
pub(crate) struct DecimalsCfg {
    global: Option<u32>,
    names: HashMap<String, u32>,
    indexes: HashMap<usize, u32>,
}

impl DecimalsCfg {
    pub(crate) fn select(&self, name: &str, idx: usize) -> Option<u32> {
        if let Some(dec) = self.names.get(name) {
            return Some(*dec);
        }
        if let Some(dec) = self.indexes.get(&idx) {
            return Some(*dec);
        }
        self.global
    }
}

/// Accepts an int, a numeric string, a list (by output index), or a map
/// keyed by output name or index.
pub(crate) fn parse_decimals_hint(hint: Option<&Value>) -> Result<DecimalsCfg, InputError> {
    let mut cfg = DecimalsCfg::default();
    let Some(hint) = hint else {
        return Ok(cfg);
    };

    let invalid = || InputError::other("decimals must be a non-negative integer.");
    let parse_one = |value: &Value| -> Result<u32, InputError> {
        match value {
            Value::Number(n) => {
                n.as_u64().and_then(|v| u32::try_from(v).ok()).ok_or_else(invalid)
            }
            Value::String(s) => {
                let trimmed = s.trim();
                let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
                trimmed.parse::<u32>().map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    };

    match hint {
        Value::Null => {}
        Value::Number(_) | Value::String(_) => {
            cfg.global = Some(parse_one(hint)?);
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                cfg.indexes.insert(idx, parse_one(item)?);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                let dec = parse_one(value)?;
                match key.trim().parse::<usize>() {
                    Ok(idx) => {
                        cfg.indexes.insert(idx, dec);
                    }
                    Err(_) => {
                        cfg.names.insert(key.clone(), dec);
                    }
                }
            }
        }
        _ => return Err(InputError::other("decimals hint must be int, str, list, or dict.")),
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance_of_entry() -> AbiFunction {
        serde_json::from_value(json!({
            "name": "balanceOf",
            "inputs": [{"name": "owner", "type": "address"}],
            "outputs": [{"name": "balance", "type": "uint256"}]
        }))
        .unwrap()
    }

    fn meta_with_entry() -> FuncMeta {
        FuncMeta {
            selector: "70a08231".to_string(),
            name: Some("balanceOf".to_string()),
            signature: Some("balanceOf(address)".to_string()),
            source: Some("contract".to_string()),
            entry: Some(balance_of_entry()),
            warning: None,
        }
    }

    #[test]
    fn decode_uint_output_with_decimals() {
        // 1.5 tokens at 18 decimals
        let result = format!("0x{:064x}", 1_500_000_000_000_000_000u128);
        let decoded = decode_call_result(&result, &meta_with_entry(), Some(&json!(18)));
        assert_eq!(decoded["ok"], json!(true));
        let output = &decoded["outputs"][0];
        assert_eq!(output["name"], json!("balance"));
        assert_eq!(output["value"], json!(1_500_000_000_000_000_000u64));
        assert_eq!(output["decimals"], json!(18));
        assert_eq!(output["value_scaled"], json!("1.5"));
    }

    #[test]
    fn decode_without_entry_reports_error() {
        let meta = FuncMeta { selector: "a9059cbb".to_string(), ..Default::default() };
        let decoded = decode_call_result("0x", &meta, None);
        assert_eq!(decoded["ok"], json!(false));
        assert_eq!(decoded["error"], json!("ABI not available for decoding."));
        assert_eq!(decoded["selector"], json!("0xa9059cbb"));
    }

    #[test]
    fn decode_failure_is_soft() {
        let decoded = decode_call_result("0x1234", &meta_with_entry(), None);
        assert_eq!(decoded["ok"], json!(false));
        assert!(decoded["error"].as_str().unwrap().starts_with("Failed to decode result:"));
    }

    #[test]
    fn empty_outputs_is_ok() {
        let mut meta = meta_with_entry();
        meta.entry = Some(
            serde_json::from_value(json!({"name": "renounce", "inputs": [], "outputs": []}))
                .unwrap(),
        );
        let decoded = decode_call_result("0x", &meta, None);
        assert_eq!(decoded["ok"], json!(true));
        assert_eq!(decoded["error"], Value::Null);
    }

    #[test]
    fn warning_is_carried_through() {
        let mut meta = FuncMeta { selector: "deadbeef".to_string(), ..Default::default() };
        meta.warning = Some("Function selector 0xdeadbeef not found in cached ABI; returning raw result.".to_string());
        let decoded = decode_call_result("0x01", &meta, None);
        assert!(decoded["warning"].as_str().unwrap().contains("0xdeadbeef"));
    }

    #[test]
    fn decimals_hint_forms() {
        let global = parse_decimals_hint(Some(&json!(18))).unwrap();
        assert_eq!(global.select("anything", 3), Some(18));

        let by_index = parse_decimals_hint(Some(&json!([6, 18]))).unwrap();
        assert_eq!(by_index.select("x", 0), Some(6));
        assert_eq!(by_index.select("x", 1), Some(18));
        assert_eq!(by_index.select("x", 2), None);

        let by_name = parse_decimals_hint(Some(&json!({"balance": 6, "1": 9}))).unwrap();
        assert_eq!(by_name.select("balance", 5), Some(6));
        assert_eq!(by_name.select("other", 1), Some(9));
        assert_eq!(by_name.select("other", 0), None);

        assert!(parse_decimals_hint(Some(&json!(true))).is_err());
        assert!(parse_decimals_hint(Some(&json!([true]))).is_err());
    }

    #[test]
    fn negative_scaled_output() {
        assert_eq!(scale_digits("-1500000000", 9), "-1.5");
        assert_eq!(scale_digits("1500000000", 9), "1.5");
    }
}
