//! Stable record shapes shared across the service.
//!
//! Records are immutable once cached: a cache entry is written on the first
//! successful fetch and never mutated in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::InputError;

/// One source file of a verified contract, as reported by the explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub filename: String,
    pub content: String,
}

/// Verified contract metadata: ABI, sources, compiler, proxy hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractRecord {
    pub address: String,
    pub network: String,
    pub chain_id: String,
    /// JSON array of ABI entries, exactly as published by the explorer.
    pub abi: Value,
    pub source_files: Vec<SourceFile>,
    pub compiler: String,
    pub verified: bool,
    pub proxy: bool,
    pub implementation: Option<String>,
    pub proxy_type: Option<String>,
}

/// Where a creation record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationSource {
    Etherscan,
    Rpc,
}

impl fmt::Display for CreationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Etherscan => write!(f, "etherscan"),
            Self::Rpc => write!(f, "rpc"),
        }
    }
}

/// Contract deployment provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationRecord {
    pub address: String,
    pub network: String,
    pub chain_id: String,
    pub creator: String,
    pub tx_hash: String,
    /// Decimal string.
    pub block_number: String,
    /// Unix seconds as a decimal string, when known.
    pub timestamp: Option<String>,
    pub source: CreationSource,
    /// `true` when both creator and tx hash were recovered.
    pub complete: bool,
}

/// Proxy structure of a contract, from explorer metadata or EIP-1967 slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub address: String,
    pub network: String,
    pub chain_id: String,
    pub is_proxy: bool,
    pub implementation: Option<String>,
    pub admin: Option<String>,
    /// `"etherscan"`, `"eip1967"`, or absent for non-proxies.
    pub proxy_type: Option<String>,
    /// Human-readable provenance, one line per observation.
    pub evidence: Vec<String>,
}

/// Token transfer class for the explorer's account endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Erc20,
    Erc721,
    Erc1155,
}

impl TokenType {
    /// The explorer `action` parameter for this token class.
    pub fn action(self) -> &'static str {
        match self {
            Self::Erc20 => "tokentx",
            Self::Erc721 => "tokennfttx",
            Self::Erc1155 => "token1155tx",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
            Self::Erc1155 => "erc1155",
        }
    }
}

impl FromStr for TokenType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "erc20" => Ok(Self::Erc20),
            "erc721" => Ok(Self::Erc721),
            "erc1155" => Ok(Self::Erc1155),
            other => Err(InputError::TokenType { got: other.to_string() }),
        }
    }
}
