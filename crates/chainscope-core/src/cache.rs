//! In-memory record cache keyed by (chain id, lowercased address).
//!
//! Thread-safe via `RwLock`; entries are written on first successful fetch
//! and never invalidated. Duplicate concurrent fetches are allowed (last
//! write wins); no lock is ever held across network I/O.

use std::collections::HashMap;
use std::sync::RwLock;

/// A typed cache of per-contract records for one namespace.
#[derive(Debug, Default)]
pub struct RecordCache<T> {
    inner: RwLock<HashMap<(String, String), T>>,
}

impl<T: Clone> RecordCache<T> {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    pub fn get(&self, chain_id: &str, address: &str) -> Option<T> {
        let map = self.inner.read().unwrap();
        map.get(&(chain_id.to_string(), address.to_ascii_lowercase())).cloned()
    }

    pub fn set(&self, chain_id: &str, address: &str, record: T) {
        let mut map = self.inner.write().unwrap();
        map.insert((chain_id.to_string(), address.to_ascii_lowercase()), record);
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let cache: RecordCache<u32> = RecordCache::new();
        cache.set("1", "0xAbC", 7);
        assert_eq!(cache.get("1", "0xabc"), Some(7));
        assert_eq!(cache.get("1", "0xABC"), Some(7));
    }

    #[test]
    fn keys_are_chain_scoped() {
        let cache: RecordCache<u32> = RecordCache::new();
        cache.set("1", "0xabc", 7);
        assert_eq!(cache.get("10", "0xabc"), None);
    }
}
