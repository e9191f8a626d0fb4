//! Per-invocation input normalization and chain resolution.

use chainscope_core::config::resolve_static;
use chainscope_core::error::InputError;
use chainscope_core::hex::{normalize_address, normalize_hex, parse_hex_u64};

use crate::{ContractService, ServiceError};

pub(crate) const MAX_BLOCK: u64 = 99_999_999;
pub(crate) const DEFAULT_PAGE: u64 = 1;
pub(crate) const DEFAULT_OFFSET: u64 = 100;

impl ContractService {
    /// Normalize the address and resolve (label, chain id).
    pub(crate) async fn prepare_context(
        &self,
        address: &str,
        network: Option<&str>,
    ) -> Result<(String, String, String), ServiceError> {
        let normalized = normalize_address(address)?;
        let (label, chain_id) = self.resolve_network_and_chain(network).await?;
        Ok((normalized, label, chain_id))
    }

    /// Resolve a network argument via the registry, falling back to the
    /// static map; with no argument, use the configured defaults.
    pub(crate) async fn resolve_network_and_chain(
        &self,
        network: Option<&str>,
    ) -> Result<(String, String), ServiceError> {
        let Some(network) = network.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok((self.config.network.clone(), self.config.chain_id.clone()));
        };

        match self.registry.resolve(network).await {
            Ok(resolved) => Ok((resolved.label, resolved.chain_id)),
            Err(registry_err) => match resolve_static(network) {
                Ok(chain_id) => {
                    tracing::debug!(
                        network,
                        chain_id = %chain_id,
                        error = %registry_err,
                        "registry resolution failed; using static map"
                    );
                    Ok((network.to_ascii_lowercase(), chain_id))
                }
                Err(_) => Err(registry_err.into()),
            },
        }
    }
}

/// Parse a block number in decimal or 0x-prefixed hexadecimal.
pub(crate) fn parse_block_number(
    value: Option<&str>,
    default: u64,
    field: &str,
) -> Result<u64, InputError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    let lowered = raw.to_ascii_lowercase();
    if let Some(body) = lowered.strip_prefix("0x") {
        return u64::from_str_radix(body, 16)
            .map_err(|_| InputError::BlockNumber { field: field.to_string() });
    }
    lowered.parse::<u64>().map_err(|_| InputError::BlockNumber { field: field.to_string() })
}

/// Normalize a (start, end) block range with defaults 0..=MAX_BLOCK.
pub(crate) fn normalize_block_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(u64, u64), InputError> {
    let start_block = parse_block_number(start, 0, "start_block")?;
    let end_block = parse_block_number(end, MAX_BLOCK, "end_block")?;
    if start_block > end_block {
        return Err(InputError::BlockRange);
    }
    Ok((start_block, end_block))
}

pub(crate) fn normalize_sort(sort: Option<&str>) -> Result<String, InputError> {
    match sort {
        None => Ok("asc".to_string()),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "asc" | "desc" => Ok(raw.to_ascii_lowercase()),
            _ => Err(InputError::Sort),
        },
    }
}

/// Normalize a block tag: `latest|earliest|pending`, a decimal number
/// (converted to hex), or an already-hex quantity.
pub(crate) fn normalize_block_tag(tag: Option<&str>) -> Result<String, InputError> {
    let Some(raw) = tag.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok("latest".to_string());
    };
    let lowered = raw.to_ascii_lowercase();
    match lowered.as_str() {
        "latest" | "earliest" | "pending" => return Ok(lowered),
        _ => {}
    }
    if lowered.bytes().all(|b| b.is_ascii_digit()) {
        let number: u64 = lowered.parse().map_err(|_| InputError::BlockTag)?;
        return Ok(format!("{number:#x}"));
    }
    if lowered.starts_with("0x") {
        if parse_hex_u64(&lowered).is_some() {
            return Ok(lowered);
        }
    }
    Err(InputError::BlockTag)
}

/// Normalize up to four topic filters into `topic{i}` query parameters,
/// skipping empty slots.
pub(crate) fn normalize_topics(
    topics: &[Option<String>],
) -> Result<Vec<(String, String)>, InputError> {
    if topics.len() > 4 {
        return Err(InputError::TooManyTopics);
    }
    let mut params = Vec::new();
    for (idx, topic) in topics.iter().enumerate() {
        let Some(topic) = topic.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        params.push((format!("topic{idx}"), normalize_hex(topic, &format!("topic{idx}"))?));
    }
    Ok(params)
}
