//! Lazily populated map from grouping key to region cache.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::region::{CacheStats, RegionCache};

/// One [`RegionCache`] per grouping key, created on first use and kept for
/// the life of the registry.
///
/// Established keys are served from a shard read lock; creation goes through
/// the entry API so two racing first requests share one cache.
pub struct KeyedCacheRegistry<K: Eq + Hash> {
    caches: DashMap<K, Arc<RegionCache>>,
    ttl: Duration,
}

impl<K> KeyedCacheRegistry<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            caches: DashMap::new(),
            ttl,
        }
    }

    /// Returns the cache for `key`, creating it if needed.
    pub fn get_or_create(&self, key: &K) -> Arc<RegionCache> {
        if let Some(cache) = self.caches.get(key) {
            return Arc::clone(cache.value());
        }

        let ttl = self.ttl;
        let cache = self.caches.entry(key.clone()).or_insert_with(|| {
            debug!(key = ?key, "Creating region cache");
            Arc::new(RegionCache::new(ttl))
        });
        Arc::clone(cache.value())
    }

    /// Returns the cache for `key` without creating one.
    pub fn get(&self, key: &K) -> Option<Arc<RegionCache>> {
        self.caches.get(key).map(|cache| Arc::clone(cache.value()))
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Statistics summed over every cache.
    pub fn stats(&self) -> CacheStats {
        self.caches
            .iter()
            .map(|entry| entry.value().stats())
            .fold(CacheStats::default(), |acc, s| CacheStats {
                hits: acc.hits + s.hits,
                misses: acc.misses + s.misses,
                puts: acc.puts + s.puts,
                expired: acc.expired + s.expired,
                searches: acc.searches + s.searches,
                coalesced: acc.coalesced + s.coalesced,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum Key {
        Day(u32),
        Pass(String, i64),
    }

    #[test]
    fn test_same_key_shares_cache() {
        let registry = KeyedCacheRegistry::new(Duration::from_secs(600));

        let a = registry.get_or_create(&Key::Day(1));
        let b = registry.get_or_create(&Key::Day(1));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_keys_are_isolated() {
        let registry = KeyedCacheRegistry::new(Duration::from_secs(600));
        let tile = TileCoord::new(100, 200, 13).unwrap();

        registry
            .get_or_create(&Key::Day(1))
            .put(tile.padded_bound(5), Arc::new(Vec::new()));

        let other = registry.get_or_create(&Key::Pass("0f2b".into(), 1_700_000_000));
        assert!(other.get(&tile.bound()).is_none());
        assert!(registry.get(&Key::Day(1)).unwrap().get(&tile.bound()).is_some());
        assert!(registry.get(&Key::Day(2)).is_none());

        let stats = registry.stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_concurrent_creation_yields_one_cache() {
        let registry = Arc::new(KeyedCacheRegistry::new(Duration::from_secs(600)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get_or_create(&Key::Day(7)))
            })
            .collect();

        let caches: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(caches.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }
}
