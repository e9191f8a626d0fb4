//! Service configuration.
//!
//! Values come from environment variables (names and defaults below); the
//! static network map is the last-ditch fallback used when the remote chain
//! registry is unavailable.

use std::collections::HashMap;
use std::env;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.etherscan.io/v2/api";
pub const DEFAULT_CHAINLIST_URL: &str = "https://api.etherscan.io/v2/chainlist";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_SECONDS: f64 = 0.5;
pub const DEFAULT_CHAINLIST_TTL_SECONDS: u64 = 3600;

/// Core networks that keep working if the chainlist fetch fails.
const STATIC_NETWORK_MAP: &[(&str, &str)] = &[
    ("mainnet", "1"),
    ("ethereum", "1"),
    ("eth", "1"),
    ("bsc", "56"),
    ("sepolia", "11155111"),
    ("holesky", "17000"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ETHERSCAN_API_KEY is required but not set.")]
    MissingApiKey,

    #[error("{name} must be a number, got '{got}'.")]
    BadNumber { name: String, got: String },

    #[error(
        "Unknown network '{network}' in static map. Supported: {supported}. \
         Provide numeric chainid, set CHAIN_ID explicitly, or rely on chainlist dynamic resolution."
    )]
    UnknownNetwork { network: String, supported: String },
}

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub chainlist_url: String,
    /// Raw default network label (lowercased).
    pub network: String,
    /// Resolved default chain id (decimal string).
    pub chain_id: String,
    pub chain_id_override: Option<String>,
    pub request_timeout: u64,
    pub max_retries: u32,
    pub backoff_seconds: f64,
    pub chainlist_ttl_seconds: u64,
    /// chain id -> JSON-RPC URL.
    pub rpc_urls: HashMap<String, String>,
    pub rpc_url_default: Option<String>,
}

impl Config {
    /// A configuration with defaults for everything but the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chainlist_url: DEFAULT_CHAINLIST_URL.to_string(),
            network: "mainnet".to_string(),
            chain_id: "1".to_string(),
            chain_id_override: None,
            request_timeout: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_seconds: DEFAULT_BACKOFF_SECONDS,
            chainlist_ttl_seconds: DEFAULT_CHAINLIST_TTL_SECONDS,
            rpc_urls: HashMap::new(),
            rpc_url_default: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = env_or("ETHERSCAN_BASE_URL", DEFAULT_BASE_URL);
        let chainlist_url = env_or("ETHERSCAN_CHAINLIST_URL", DEFAULT_CHAINLIST_URL);
        let network = env_or("NETWORK", "mainnet").trim().to_ascii_lowercase();
        let chain_id_override = env::var("CHAIN_ID").ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_timeout = parse_env_number("REQUEST_TIMEOUT", DEFAULT_TIMEOUT_SECONDS)?;
        let max_retries = parse_env_number("REQUEST_RETRIES", DEFAULT_MAX_RETRIES)?;
        let backoff_seconds = parse_env_float("REQUEST_BACKOFF_SECONDS", DEFAULT_BACKOFF_SECONDS)?;
        let chainlist_ttl_seconds =
            parse_env_number("CHAINLIST_TTL_SECONDS", DEFAULT_CHAINLIST_TTL_SECONDS)?;

        let rpc_urls = rpc_urls_from_env();
        let rpc_url_default =
            env::var("RPC_URL").ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Default-chain resolution never fails service construction; unknown
        // labels defer to the registry at call time and mainnet backs the
        // initial client.
        let chain_id = match &chain_id_override {
            Some(id) => id.clone(),
            None => resolve_static(&network).unwrap_or_else(|_| "1".to_string()),
        };

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            chainlist_url: chainlist_url.trim_end_matches('/').to_string(),
            network,
            chain_id,
            chain_id_override,
            request_timeout,
            max_retries,
            backoff_seconds,
            chainlist_ttl_seconds,
            rpc_urls,
            rpc_url_default,
        })
    }

    /// The JSON-RPC URL for `chain_id`, if one is configured.
    ///
    /// Per-chain URLs take precedence over the default URL.
    pub fn rpc_url_for(&self, chain_id: &str) -> Option<&str> {
        self.rpc_urls
            .get(chain_id)
            .map(String::as_str)
            .or(self.rpc_url_default.as_deref())
    }
}

/// Resolve a network label against the static fallback map.
///
/// Numeric input is accepted as a chain id directly.
pub fn resolve_static(network: &str) -> Result<String, ConfigError> {
    let normalized = network.trim().to_ascii_lowercase();
    if !normalized.is_empty() && normalized.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(normalized);
    }
    for (name, id) in STATIC_NETWORK_MAP {
        if *name == normalized {
            return Ok((*id).to_string());
        }
    }
    let mut supported: Vec<&str> = STATIC_NETWORK_MAP.iter().map(|(name, _)| *name).collect();
    supported.sort_unstable();
    supported.push("<chain_id>");
    Err(ConfigError::UnknownNetwork {
        network: network.to_string(),
        supported: supported.join(", "),
    })
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn parse_env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::BadNumber { name: name.to_string(), got: raw }),
        _ => Ok(default),
    }
}

fn parse_env_float(name: &str, default: f64) -> Result<f64, ConfigError> {
    parse_env_number(name, default)
}

/// Collect `RPC_URL_<chainid>` / `RPC_<chainid>` variables into a map.
fn rpc_urls_from_env() -> HashMap<String, String> {
    let mut urls = HashMap::new();
    for (key, value) in env::vars() {
        let chain_id = key
            .strip_prefix("RPC_URL_")
            .or_else(|| key.strip_prefix("RPC_"))
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()));
        if let Some(chain_id) = chain_id {
            let url = value.trim();
            if !url.is_empty() {
                urls.insert(chain_id.to_string(), url.to_string());
            }
        }
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_map_core_networks() {
        assert_eq!(resolve_static("mainnet").unwrap(), "1");
        assert_eq!(resolve_static("ETH").unwrap(), "1");
        assert_eq!(resolve_static("bsc").unwrap(), "56");
        assert_eq!(resolve_static("sepolia").unwrap(), "11155111");
        assert_eq!(resolve_static("holesky").unwrap(), "17000");
    }

    #[test]
    fn static_map_accepts_numeric() {
        assert_eq!(resolve_static("42161").unwrap(), "42161");
    }

    #[test]
    fn static_map_rejects_unknown() {
        let err = resolve_static("base").unwrap_err();
        assert!(err.to_string().contains("Unknown network 'base'"));
    }

    #[test]
    fn per_chain_rpc_url_precedence() {
        let mut config = Config::new("key");
        config.rpc_url_default = Some("https://default.example".into());
        config.rpc_urls.insert("10".into(), "https://op.example".into());
        assert_eq!(config.rpc_url_for("10"), Some("https://op.example"));
        assert_eq!(config.rpc_url_for("1"), Some("https://default.example"));
    }

    #[test]
    fn no_rpc_when_unconfigured() {
        let config = Config::new("key");
        assert_eq!(config.rpc_url_for("1"), None);
    }
}
