//! Verified contract metadata: fetch, parse, inline policy, file access.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use chainscope_client::envelope::extract_result_list;
use chainscope_client::ClientError;
use chainscope_core::hex::normalize_address_opt;
use chainscope_core::types::{ContractRecord, ProxyRecord, SourceFile};

use crate::{ContractService, ServiceError};

/// Default cap on the summed source length inlined into one response.
pub(crate) const DEFAULT_INLINE_LIMIT: usize = 20_000;

impl ContractService {
    /// Fetch verified contract metadata.
    ///
    /// When the summed source length exceeds `inline_limit` (default
    /// 20,000) and `force_inline` is unset, file bodies are replaced by
    /// `{filename, length, sha256, inline: false}` stubs.
    pub async fn fetch_contract(
        &self,
        address: &str,
        network: Option<&str>,
        inline_limit: Option<usize>,
        force_inline: bool,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let record = self.fetch_contract_record(&address, &label, &chain_id).await?;

        let mut response = serde_json::to_value(&record).expect("record serializes");
        let (files, omitted) =
            apply_inline_policy(&record.source_files, inline_limit.unwrap_or(DEFAULT_INLINE_LIMIT), force_inline);
        response["source_files"] = files;
        if let Some(reason) = omitted {
            response["source_omitted"] = json!(true);
            response["source_omitted_reason"] = json!(reason);
        }
        Ok(response)
    }

    /// Return one source file, optionally windowed by character offset and
    /// length.
    pub async fn get_source_file(
        &self,
        address: &str,
        filename: &str,
        network: Option<&str>,
        offset: Option<usize>,
        length: Option<usize>,
    ) -> Result<Value, ServiceError> {
        let (address, label, chain_id) = self.prepare_context(address, network).await?;
        let record = self.fetch_contract_record(&address, &label, &chain_id).await?;

        let file = record
            .source_files
            .iter()
            .find(|file| file.filename == filename)
            .ok_or_else(|| ServiceError::SourceFileNotFound {
                filename: filename.to_string(),
                available: record
                    .source_files
                    .iter()
                    .map(|f| f.filename.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let window = slice_source_file(file, offset.unwrap_or(0), length)?;
        Ok(json!({
            "address": address,
            "network": label,
            "chain_id": chain_id,
            "filename": file.filename,
            "content": window.content,
            "offset": window.offset,
            "length": window.length,
            "total_length": window.total_length,
            "truncated": window.truncated,
        }))
    }

    /// Cached fetch of the parsed contract record; a proxy hint from the
    /// explorer metadata seeds the proxy cache.
    pub(crate) async fn fetch_contract_record(
        &self,
        address: &str,
        network: &str,
        chain_id: &str,
    ) -> Result<ContractRecord, ServiceError> {
        if let Some(cached) = self.contracts.get(chain_id, address) {
            tracing::debug!(address, chain_id, "contract cache hit");
            return Ok(cached);
        }

        let payload = self.client.contract_source(chain_id, address).await?;
        let record = parse_contract_response(&payload, address, network, chain_id)?;
        self.contracts.set(chain_id, address, record.clone());
        if let Some(proxy) = proxy_info_from_contract(&record) {
            self.proxies.set(chain_id, address, proxy);
        }
        Ok(record)
    }
}

pub(crate) struct SourceWindow {
    pub content: String,
    pub offset: usize,
    pub length: usize,
    pub total_length: usize,
    pub truncated: bool,
}

/// Character-windowed view of one source file. `offset` past the end is an
/// input error; a window ending before the end sets `truncated`.
pub(crate) fn slice_source_file(
    file: &SourceFile,
    offset: usize,
    length: Option<usize>,
) -> Result<SourceWindow, ServiceError> {
    let total_length = file.content.chars().count();
    if offset > total_length {
        return Err(chainscope_core::error::InputError::other(format!(
            "offset {offset} exceeds total_length {total_length}."
        ))
        .into());
    }
    let remaining = total_length - offset;
    let take = length.unwrap_or(remaining).min(remaining);
    let content: String = file.content.chars().skip(offset).take(take).collect();
    Ok(SourceWindow {
        content,
        offset,
        length: take,
        total_length,
        truncated: offset + take < total_length,
    })
}

/// Inline the sources or replace them with digest stubs, per the limit.
pub(crate) fn apply_inline_policy(
    files: &[SourceFile],
    inline_limit: usize,
    force_inline: bool,
) -> (Value, Option<String>) {
    let total: usize = files.iter().map(|f| f.content.chars().count()).sum();
    if force_inline || total <= inline_limit {
        let inlined: Vec<Value> = files
            .iter()
            .map(|f| json!({"filename": f.filename, "content": f.content, "inline": true}))
            .collect();
        return (json!(inlined), None);
    }

    let stubs: Vec<Value> = files
        .iter()
        .map(|f| {
            let digest = Sha256::digest(f.content.as_bytes());
            json!({
                "filename": f.filename,
                "length": f.content.chars().count(),
                "sha256": hex::encode(digest),
                "inline": false,
            })
        })
        .collect();
    let reason = format!(
        "total source length {total} exceeds inline_limit {inline_limit}; \
         use get_source_file to read files, or force_inline to bypass"
    );
    (json!(stubs), Some(reason))
}

/// Parse a `getsourcecode` response into a [`ContractRecord`].
pub(crate) fn parse_contract_response(
    payload: &Value,
    address: &str,
    network: &str,
    chain_id: &str,
) -> Result<ContractRecord, ServiceError> {
    let result = extract_result_list(payload, true)?;
    let entry = result.first().ok_or(ClientError::EmptyResult { backend: "Etherscan".into() })?;

    let abi_raw = entry.get("ABI").and_then(Value::as_str).unwrap_or("[]");
    let abi: Value = serde_json::from_str(abi_raw)
        .map_err(|_| ClientError::upstream("Etherscan", "Invalid ABI returned"))?;

    let source_files =
        parse_source_code(entry.get("SourceCode").and_then(Value::as_str).unwrap_or(""));
    let compiler =
        entry.get("CompilerVersion").and_then(Value::as_str).unwrap_or_default().to_string();

    let proxy_flag = entry
        .get("Proxy")
        .and_then(Value::as_str)
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();
    let mut is_proxy = matches!(proxy_flag.as_str(), "1" | "true" | "yes");
    let implementation =
        normalize_address_opt(entry.get("Implementation").and_then(Value::as_str));
    if implementation.is_some() {
        is_proxy = true;
    }

    Ok(ContractRecord {
        address: address.to_string(),
        network: network.to_string(),
        chain_id: chain_id.to_string(),
        abi,
        source_files,
        compiler,
        verified: true,
        proxy: is_proxy,
        implementation,
        proxy_type: is_proxy.then(|| "etherscan".to_string()),
    })
}

/// Unpack the explorer's `SourceCode` field.
///
/// Shapes seen in the wild: standard-JSON wrapped in doubled braces, a
/// plain object with a `sources` map, an object with a single `content`,
/// or the raw flattened source text.
pub(crate) fn parse_source_code(raw: &str) -> Vec<SourceFile> {
    if raw.is_empty() {
        return Vec::new();
    }

    let trimmed = raw.trim();
    let unwrapped = if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    if unwrapped.starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(unwrapped) {
            if let Some(sources) = parsed.get("sources").and_then(Value::as_object) {
                let files: Vec<SourceFile> = sources
                    .iter()
                    .filter_map(|(name, meta)| {
                        meta.get("content").and_then(Value::as_str).map(|content| SourceFile {
                            filename: name.clone(),
                            content: content.to_string(),
                        })
                    })
                    .collect();
                if !files.is_empty() {
                    return files;
                }
            }
            if let Some(content) = parsed.get("content").and_then(Value::as_str) {
                let filename = parsed
                    .get("fileName")
                    .and_then(Value::as_str)
                    .unwrap_or("Contract.sol")
                    .to_string();
                return vec![SourceFile { filename, content: content.to_string() }];
            }
        }
    }

    vec![SourceFile { filename: "Contract.sol".to_string(), content: raw.to_string() }]
}

/// Synthesize a proxy record from explorer-reported metadata.
pub(crate) fn proxy_info_from_contract(contract: &ContractRecord) -> Option<ProxyRecord> {
    let implementation = contract.implementation.clone();
    if !contract.proxy && implementation.is_none() {
        return None;
    }
    let mut evidence = vec!["Etherscan getsourcecode Proxy/Implementation fields".to_string()];
    if let Some(impl_addr) = &implementation {
        evidence.push(format!("implementation field -> {impl_addr}"));
    }
    Some(ProxyRecord {
        address: contract.address.clone(),
        network: contract.network.clone(),
        chain_id: contract.chain_id.clone(),
        is_proxy: true,
        implementation,
        admin: None,
        proxy_type: Some(contract.proxy_type.clone().unwrap_or_else(|| "etherscan".to_string())),
        evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload(source: &str, proxy: &str, implementation: &str) -> Value {
        json!({
            "status": "1",
            "message": "OK",
            "result": [{
                "ABI": "[{\"type\":\"function\",\"name\":\"f\",\"inputs\":[],\"outputs\":[]}]",
                "SourceCode": source,
                "CompilerVersion": "v0.8.19+commit.7dd6d404",
                "Proxy": proxy,
                "Implementation": implementation,
            }]
        })
    }

    #[test]
    fn parse_flat_source() {
        let record = parse_contract_response(
            &sample_payload("contract C {}", "0", ""),
            "0xabc0000000000000000000000000000000000abc",
            "mainnet",
            "1",
        )
        .unwrap();
        assert_eq!(record.source_files.len(), 1);
        assert_eq!(record.source_files[0].filename, "Contract.sol");
        assert!(!record.proxy);
        assert!(record.proxy_type.is_none());
        assert!(record.verified);
    }

    #[test]
    fn parse_standard_json_sources() {
        let source = r#"{{"language":"Solidity","sources":{"A.sol":{"content":"contract A {}"},"B.sol":{"content":"contract B {}"}}}}"#;
        let files = parse_source_code(source);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "A.sol");
        assert_eq!(files[1].filename, "B.sol");
    }

    #[test]
    fn parse_single_content_object() {
        let files = parse_source_code(r#"{"fileName":"Token.sol","content":"contract T {}"}"#);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "Token.sol");
    }

    #[test]
    fn implementation_field_implies_proxy() {
        let record = parse_contract_response(
            &sample_payload("x", "0", "0xDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF"),
            "0xabc0000000000000000000000000000000000abc",
            "mainnet",
            "1",
        )
        .unwrap();
        assert!(record.proxy);
        assert_eq!(record.proxy_type.as_deref(), Some("etherscan"));
        assert_eq!(
            record.implementation.as_deref(),
            Some("0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef")
        );

        let proxy = proxy_info_from_contract(&record).unwrap();
        assert!(proxy.is_proxy);
        assert_eq!(proxy.evidence.len(), 2);
    }

    #[test]
    fn unverified_contract_is_an_error() {
        // Unverified contracts answer status=1 with a sentinel in the ABI field.
        let payload = json!({
            "status": "1",
            "message": "OK",
            "result": [{"ABI": "Contract source code not verified", "SourceCode": ""}]
        });
        let err = parse_contract_response(&payload, "0x", "mainnet", "1").unwrap_err();
        assert!(err.to_string().contains("Invalid ABI returned"));
    }

    fn files(specs: &[(&str, usize)]) -> Vec<SourceFile> {
        specs
            .iter()
            .map(|(name, len)| SourceFile {
                filename: name.to_string(),
                content: "x".repeat(*len),
            })
            .collect()
    }

    #[test]
    fn inline_policy_under_limit() {
        let (value, omitted) = apply_inline_policy(&files(&[("A.sol", 10), ("B.sol", 10)]), 20, false);
        assert!(omitted.is_none());
        let list = value.as_array().unwrap();
        assert!(list.iter().all(|f| f["inline"] == json!(true) && f.get("content").is_some()));
    }

    #[test]
    fn inline_policy_over_limit() {
        let (value, omitted) = apply_inline_policy(&files(&[("A.sol", 30)]), 20, false);
        assert!(omitted.is_some());
        let list = value.as_array().unwrap();
        assert_eq!(list[0]["inline"], json!(false));
        assert!(list[0].get("content").is_none());
        assert_eq!(list[0]["length"], json!(30));
        assert_eq!(list[0]["sha256"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn inline_policy_forced() {
        let (value, omitted) = apply_inline_policy(&files(&[("A.sol", 30)]), 20, true);
        assert!(omitted.is_none());
        assert_eq!(value.as_array().unwrap()[0]["inline"], json!(true));
    }

    #[test]
    fn source_window_basic() {
        let file = SourceFile { filename: "A.sol".into(), content: "0123456789".into() };
        let window = slice_source_file(&file, 2, Some(5)).unwrap();
        assert_eq!(window.content, "23456");
        assert!(window.truncated);
        assert_eq!(window.total_length, 10);

        let rest = slice_source_file(&file, 5, None).unwrap();
        assert_eq!(rest.content, "56789");
        assert!(!rest.truncated);
    }

    #[test]
    fn source_window_offset_past_end() {
        let file = SourceFile { filename: "A.sol".into(), content: "abc".into() };
        assert!(slice_source_file(&file, 4, None).is_err());
        // offset == total_length is an empty, non-truncated window
        let window = slice_source_file(&file, 3, None).unwrap();
        assert!(window.content.is_empty());
        assert!(!window.truncated);
    }
}
