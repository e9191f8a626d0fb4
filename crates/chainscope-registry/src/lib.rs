//! Dynamic EVM chain registry backed by the explorer's chainlist endpoint.
//!
//! - Caches the chain list in memory with a TTL; `refresh()` swaps the
//!   whole snapshot atomically under a write lock, so readers see either
//!   the prior or the new index, never a half-built one.
//! - Resolves a free-form network argument by chain id or (fuzzy) chain
//!   name, slug, and alias.
//!
//! Purely numeric input bypasses the registry entirely and is accepted
//! even when the chainlist is unavailable.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

use chainscope_client::envelope::extract_chainlist;
use chainscope_client::{ClientError, EtherscanClient};

/// Minimum accepted TTL; anything lower is clamped up.
const MIN_TTL: Duration = Duration::from_secs(30);

/// Environment words dropped to form index variants
/// ("Arbitrum One Mainnet" also indexes as "arbitrum one").
const ENV_WORDS: &[&str] = &["mainnet", "testnet", "network", "chain"];

/// Alias substitutions applied to the normalized query before lookup.
const ALIASES: &[(&str, &str)] = &[
    ("eth", "ethereum mainnet"),
    ("ethereum", "ethereum mainnet"),
    ("mainnet", "ethereum mainnet"),
    ("arb", "arbitrum one"),
    ("arbitrum", "arbitrum one"),
    ("arb1", "arbitrum one"),
    ("arbitrum one", "arbitrum one"),
    ("arbitrum nova", "arbitrum nova"),
    ("nova", "arbitrum nova"),
    ("arb sepolia", "arbitrum sepolia"),
    ("arb-sepolia", "arbitrum sepolia"),
    ("arbitrum sepolia", "arbitrum sepolia"),
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("chainlist_url is empty.")]
    MissingUrl,

    #[error("network must be a non-empty string.")]
    EmptyQuery,

    #[error("chainlist returned empty or unparseable chain set.")]
    EmptyChainSet,

    #[error("Unknown network '{query}'. Try numeric chainid (e.g. 42161) or call list-chains.")]
    UnknownNetwork { query: String },

    #[error("Ambiguous network query '{query}'. Candidates: {candidates}. Please pass a numeric chainid.")]
    Ambiguous { query: String, candidates: String },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// One chain of the remote chain list. Immutable after load.
#[derive(Debug, Clone, Serialize)]
pub struct ChainInfo {
    pub chainname: String,
    pub chainid: String,
    pub blockexplorer: String,
    pub apiurl: String,
    pub status: i64,
    pub comment: String,
}

impl ChainInfo {
    /// The slug form of the chain name, used as the resolved label.
    pub fn canonical_label(&self) -> String {
        slug(&self.chainname)
    }
}

/// Metadata attached to a resolution result.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveMeta {
    pub chainname: Option<String>,
    pub blockexplorer: Option<String>,
    pub apiurl: Option<String>,
    pub status: Option<i64>,
    pub comment: Option<String>,
    pub matched_by: String,
}

impl ResolveMeta {
    fn from_info(info: Option<&ChainInfo>, matched_by: &str) -> Self {
        match info {
            Some(info) => Self {
                chainname: Some(info.chainname.clone()),
                blockexplorer: Some(info.blockexplorer.clone()),
                apiurl: Some(info.apiurl.clone()),
                status: Some(info.status),
                comment: Some(info.comment.clone()),
                matched_by: matched_by.to_string(),
            },
            None => Self {
                chainname: None,
                blockexplorer: None,
                apiurl: None,
                status: None,
                comment: None,
                matched_by: matched_by.to_string(),
            },
        }
    }
}

/// A successful resolution: (label, chain id, metadata).
#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    pub label: String,
    pub chain_id: String,
    pub meta: ResolveMeta,
}

/// One row of [`ChainRegistry::list_chains`].
#[derive(Debug, Clone, Serialize)]
pub struct ChainEntry {
    pub chainid: String,
    pub chainname: String,
    pub label: String,
    pub blockexplorer: String,
    pub apiurl: String,
    pub status: i64,
    pub comment: String,
}

/// Where the chain list comes from. Injected so tests can script payloads.
#[async_trait]
pub trait ChainlistSource: Send + Sync {
    async fn fetch_chainlist(&self, url: &str) -> Result<Value, ClientError>;
}

#[async_trait]
impl ChainlistSource for EtherscanClient {
    async fn fetch_chainlist(&self, url: &str) -> Result<Value, ClientError> {
        self.chainlist(url).await
    }
}

#[derive(Default)]
struct Inner {
    chains: HashMap<String, ChainInfo>,
    /// normalized key -> chain ids, insertion-ordered.
    index: HashMap<String, Vec<String>>,
    loaded_at: Option<Instant>,
}

impl Inner {
    fn expired(&self, ttl: Duration) -> bool {
        self.chains.is_empty()
            || self.loaded_at.map(|at| at.elapsed() > ttl).unwrap_or(true)
    }
}

/// The chain registry.
pub struct ChainRegistry {
    source: Arc<dyn ChainlistSource>,
    chainlist_url: String,
    ttl: Duration,
    inner: RwLock<Inner>,
}

impl ChainRegistry {
    pub fn new(
        source: Arc<dyn ChainlistSource>,
        chainlist_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            chainlist_url: chainlist_url.into().trim_end_matches('/').to_string(),
            ttl: ttl.max(MIN_TTL),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Reload the chain list when stale or empty (always when `force`).
    ///
    /// The new snapshot is built off-lock and swapped in whole; concurrent
    /// refreshes may duplicate the fetch but never corrupt the index.
    pub async fn refresh(&self, force: bool) -> Result<(), RegistryError> {
        if !force && !self.inner.read().unwrap().expired(self.ttl) {
            return Ok(());
        }
        if self.chainlist_url.is_empty() {
            return Err(RegistryError::MissingUrl);
        }

        let payload = self.source.fetch_chainlist(&self.chainlist_url).await?;
        let result = extract_chainlist(&payload)?;

        let mut chains = HashMap::new();
        for item in result {
            let Some(object) = item.as_object() else { continue };
            let chainid = field_string(object.get("chainid"));
            let chainname = field_string(object.get("chainname"));
            if chainid.is_empty()
                || !chainid.bytes().all(|b| b.is_ascii_digit())
                || chainname.is_empty()
            {
                continue;
            }
            let info = ChainInfo {
                chainname,
                chainid: chainid.clone(),
                blockexplorer: field_string(object.get("blockexplorer")),
                apiurl: field_string(object.get("apiurl")),
                status: object.get("status").and_then(Value::as_i64).unwrap_or(0),
                comment: field_string(object.get("comment")),
            };
            chains.insert(chainid, info);
        }

        if chains.is_empty() {
            return Err(RegistryError::EmptyChainSet);
        }

        let index = build_index(&chains);
        tracing::debug!(chains = chains.len(), "chain registry refreshed");

        let mut inner = self.inner.write().unwrap();
        inner.chains = chains;
        inner.index = index;
        inner.loaded_at = Some(Instant::now());
        Ok(())
    }

    /// All known chains, ordered by numeric chain id ascending.
    pub async fn list_chains(
        &self,
        include_degraded: bool,
    ) -> Result<Vec<ChainEntry>, RegistryError> {
        self.refresh(false).await?;
        let inner = self.inner.read().unwrap();
        let mut ids: Vec<&String> = inner.chains.keys().collect();
        ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));

        let mut out = Vec::new();
        for id in ids {
            let info = &inner.chains[id];
            if !include_degraded && info.status != 1 {
                continue;
            }
            out.push(ChainEntry {
                chainid: info.chainid.clone(),
                chainname: info.chainname.clone(),
                label: info.canonical_label(),
                blockexplorer: info.blockexplorer.clone(),
                apiurl: info.apiurl.clone(),
                status: info.status,
                comment: info.comment.clone(),
            });
        }
        Ok(out)
    }

    /// Resolve a network argument to (label, chain id, metadata).
    pub async fn resolve(&self, network: &str) -> Result<Resolved, RegistryError> {
        let raw = network.trim();
        if raw.is_empty() {
            return Err(RegistryError::EmptyQuery);
        }

        // Numeric chain id: accepted even if the chainlist is unavailable.
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            let inner = self.inner.read().unwrap();
            return Ok(match inner.chains.get(raw) {
                Some(info) => Resolved {
                    label: info.canonical_label(),
                    chain_id: info.chainid.clone(),
                    meta: ResolveMeta::from_info(Some(info), "chainid"),
                },
                None => Resolved {
                    label: raw.to_string(),
                    chain_id: raw.to_string(),
                    meta: ResolveMeta::from_info(None, "chainid"),
                },
            });
        }

        self.refresh(false).await?;

        let mut query = norm(raw);
        for (alias, target) in ALIASES {
            if *alias == query {
                query = norm(target);
                break;
            }
        }

        let inner = self.inner.read().unwrap();
        if let Some(ids) = inner.index.get(&query) {
            return pick_or_raise(&inner, &query, ids.clone(), "exact");
        }

        let mut best: HashMap<String, u32> = HashMap::new();
        for (key, ids) in &inner.index {
            let score = if key.starts_with(&query) {
                80
            } else if key.contains(&query) {
                50
            } else {
                continue;
            };
            for id in ids {
                let entry = best.entry(id.clone()).or_insert(0);
                *entry = (*entry).max(score);
            }
        }

        if best.is_empty() {
            return Err(RegistryError::UnknownNetwork { query: raw.to_string() });
        }

        let mut ranked: Vec<(String, u32)> = best.into_iter().collect();
        ranked.sort_by_key(|(id, score)| {
            (u32::MAX - score, id.parse::<u64>().unwrap_or(u64::MAX))
        });
        let top_score = ranked[0].1;
        let top: Vec<String> =
            ranked.into_iter().filter(|(_, s)| *s == top_score).map(|(id, _)| id).collect();
        pick_or_raise(&inner, &query, top, "fuzzy")
    }
}

fn pick_or_raise(
    inner: &Inner,
    query: &str,
    mut chain_ids: Vec<String>,
    matched_by: &str,
) -> Result<Resolved, RegistryError> {
    if chain_ids.len() == 1 {
        let info = inner
            .chains
            .get(&chain_ids[0])
            .ok_or_else(|| RegistryError::UnknownNetwork { query: query.to_string() })?;
        return Ok(Resolved {
            label: info.canonical_label(),
            chain_id: info.chainid.clone(),
            meta: ResolveMeta::from_info(Some(info), matched_by),
        });
    }

    chain_ids.sort_by_key(|id| id.parse::<u64>().unwrap_or(u64::MAX));
    let previews: Vec<String> = chain_ids
        .iter()
        .take(10)
        .filter_map(|id| inner.chains.get(id))
        .map(|info| format!("{} (chainid={})", info.chainname, info.chainid))
        .collect();
    Err(RegistryError::Ambiguous {
        query: query.to_string(),
        candidates: previews.join("; "),
    })
}

fn build_index(chains: &HashMap<String, ChainInfo>) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    let mut add = |index: &mut HashMap<String, Vec<String>>, key: &str, chainid: &str| {
        let normalized = norm(key);
        if normalized.is_empty() {
            return;
        }
        let ids = index.entry(normalized).or_default();
        if !ids.iter().any(|id| id == chainid) {
            ids.push(chainid.to_string());
        }
    };

    for (cid, info) in chains {
        add(&mut index, cid, cid);
        add(&mut index, &info.chainname, cid);
        add(&mut index, &slug(&info.chainname), cid);

        let normalized = norm(&info.chainname);
        let tokens: Vec<&str> =
            normalized.split(' ').filter(|token| !ENV_WORDS.contains(token)).collect();
        if !tokens.is_empty() {
            add(&mut index, &tokens.join(" "), cid);
            add(&mut index, &tokens.join("-"), cid);
        }
    }
    index
}

/// Lowercase, keep `[a-z0-9]+` runs, join with single spaces.
pub fn norm(text: &str) -> String {
    let lowered = text.trim().to_ascii_lowercase();
    lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`norm`] with spaces replaced by `-`.
pub fn slug(text: &str) -> String {
    norm(text).replace(' ', "-")
}

fn field_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedSource {
        payload: Value,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(payload: Value) -> Arc<Self> {
            Arc::new(Self { payload, fetches: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl ChainlistSource for ScriptedSource {
        async fn fetch_chainlist(&self, _url: &str) -> Result<Value, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    fn sample_payload() -> Value {
        json!({
            "result": [
                {"chainid": "1", "chainname": "Ethereum Mainnet",
                 "blockexplorer": "https://etherscan.io",
                 "apiurl": "https://api.etherscan.io/v2/api", "status": 1, "comment": ""},
                {"chainid": "42161", "chainname": "Arbitrum One Mainnet",
                 "blockexplorer": "https://arbiscan.io",
                 "apiurl": "https://api.etherscan.io/v2/api", "status": 1, "comment": ""},
                {"chainid": "42170", "chainname": "Arbitrum Nova Mainnet",
                 "blockexplorer": "https://nova.arbiscan.io",
                 "apiurl": "https://api.etherscan.io/v2/api", "status": 0, "comment": "degraded"},
                {"chainid": "8453", "chainname": "Base Mainnet",
                 "blockexplorer": "https://basescan.org",
                 "apiurl": "https://api.etherscan.io/v2/api", "status": 1, "comment": ""}
            ]
        })
    }

    fn registry(source: Arc<ScriptedSource>) -> ChainRegistry {
        ChainRegistry::new(source, "https://api.example/chainlist", Duration::from_secs(3600))
    }

    #[test]
    fn norm_and_slug() {
        assert_eq!(norm("  Arbitrum_One-Mainnet "), "arbitrum one mainnet");
        assert_eq!(slug("Ethereum Mainnet"), "ethereum-mainnet");
        assert_eq!(norm("foo.bar"), "foo bar");
    }

    #[tokio::test]
    async fn numeric_input_bypasses_registry() {
        let source = ScriptedSource::new(json!("should not be fetched"));
        let reg = registry(Arc::clone(&source));
        let resolved = reg.resolve("42161").await.unwrap();
        assert_eq!(resolved.chain_id, "42161");
        assert_eq!(resolved.label, "42161");
        assert_eq!(resolved.meta.matched_by, "chainid");
        assert!(resolved.meta.chainname.is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn alias_resolves_exact() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let resolved = reg.resolve("arb").await.unwrap();
        assert_eq!(resolved.chain_id, "42161");
        assert_eq!(resolved.label, "arbitrum-one-mainnet");
        assert_eq!(resolved.meta.matched_by, "exact");
    }

    #[tokio::test]
    async fn env_words_dropped_from_index() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let resolved = reg.resolve("base").await.unwrap();
        assert_eq!(resolved.chain_id, "8453");
        assert_eq!(resolved.meta.matched_by, "exact");
    }

    #[tokio::test]
    async fn fuzzy_prefix_match() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let resolved = reg.resolve("ethereum main").await.unwrap();
        assert_eq!(resolved.chain_id, "1");
        assert_eq!(resolved.meta.matched_by, "fuzzy");
    }

    #[tokio::test]
    async fn ambiguous_query_lists_candidates() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let err = reg.resolve("arbitr").await.unwrap_err();
        match err {
            RegistryError::Ambiguous { candidates, .. } => {
                assert!(candidates.contains("42161"), "{candidates}");
                assert!(candidates.contains("42170"), "{candidates}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_network_suggests_chainid() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let err = reg.resolve("gibberish").await.unwrap_err();
        assert!(err.to_string().contains("Unknown network 'gibberish'"));
    }

    #[tokio::test]
    async fn ttl_caches_fetch() {
        let source = ScriptedSource::new(sample_payload());
        let reg = registry(Arc::clone(&source));
        reg.resolve("eth").await.unwrap();
        reg.resolve("base").await.unwrap();
        reg.list_chains(true).await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolution_is_deterministic_within_ttl() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let a = reg.resolve("arb").await.unwrap();
        let b = reg.resolve("arb").await.unwrap();
        assert_eq!(a.chain_id, b.chain_id);
        assert_eq!(a.label, b.label);
        assert_eq!(a.meta.matched_by, b.meta.matched_by);
    }

    #[tokio::test]
    async fn list_chains_ordered_and_filtered() {
        let reg = registry(ScriptedSource::new(sample_payload()));
        let all = reg.list_chains(true).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.chainid.as_str()).collect();
        assert_eq!(ids, vec!["1", "8453", "42161", "42170"]);

        let healthy = reg.list_chains(false).await.unwrap();
        assert!(healthy.iter().all(|c| c.status == 1));
        assert_eq!(healthy.len(), 3);
    }

    #[tokio::test]
    async fn refresh_rejects_bad_payloads() {
        let reg = registry(ScriptedSource::new(json!(["not", "an", "object"])));
        assert!(reg.refresh(true).await.is_err());

        let reg = registry(ScriptedSource::new(json!({"result": "nope"})));
        assert!(reg.refresh(true).await.is_err());

        let reg = registry(ScriptedSource::new(json!({"result": []})));
        match reg.refresh(true).await.unwrap_err() {
            RegistryError::EmptyChainSet => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}
