use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::{Cache, CacheConfig};
use crate::errors::CacheResult;
use crate::statistics::CacheStatistics;

/// Registry of named cache regions.
///
/// The SDK's data-store layer keeps one region per resource type
/// ("accounts", "groups", ...), each an independent [`Cache`] with its
/// own store and policy. Regions are created once at setup and live for
/// the lifetime of the manager; there is no removal API.
#[derive(Default)]
pub struct CacheManager {
    caches: Mutex<HashMap<String, Arc<Cache>>>,
}

impl CacheManager {
    /// Creates an empty manager.
    pub fn new() -> CacheManager {
        CacheManager::default()
    }

    /// Builds a cache from `config` and registers it under `region`.
    /// Re-creating an existing region replaces the previous cache.
    pub fn create_cache(&self, region: &str, config: CacheConfig) -> CacheResult<Arc<Cache>> {
        let cache = Arc::new(Cache::new(config)?);
        self.lock().insert(region.to_string(), Arc::clone(&cache));
        Ok(cache)
    }

    /// Returns the cache registered under `region`, if any.
    pub fn get_cache(&self, region: &str) -> Option<Arc<Cache>> {
        self.lock().get(region).cloned()
    }

    /// Statistics snapshots for every known region.
    pub fn statistics(&self) -> HashMap<String, CacheStatistics> {
        self.lock()
            .iter()
            .map(|(region, cache)| (region.clone(), cache.statistics()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Cache>>> {
        self.caches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn regions_are_independent() {
        let manager = CacheManager::new();
        manager.create_cache("foo", CacheConfig::new()).unwrap();
        manager.create_cache("bar", CacheConfig::new()).unwrap();
        manager
            .get_cache("foo")
            .unwrap()
            .put("k", json!("foo-value"), true);
        assert_eq!(manager.get_cache("bar").unwrap().get("k"), None);
        assert_eq!(
            manager.get_cache("foo").unwrap().get("k"),
            Some(json!("foo-value"))
        );
    }

    #[test]
    fn unknown_region_is_absent() {
        let manager = CacheManager::new();
        assert!(manager.get_cache("nope").is_none());
    }

    #[test]
    fn statistics_cover_exactly_the_known_regions() {
        let manager = CacheManager::new();
        manager.create_cache("foo", CacheConfig::new()).unwrap();
        manager.create_cache("bar", CacheConfig::new()).unwrap();
        manager.get_cache("foo").unwrap().put("k", json!(1), true);

        let stats = manager.statistics();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["foo"].puts, 1);
        assert_eq!(stats["foo"].size, 1);
        assert_eq!(stats["bar"], CacheStatistics::default());
    }

    #[test]
    fn recreating_a_region_replaces_the_cache() {
        let manager = CacheManager::new();
        manager.create_cache("foo", CacheConfig::new()).unwrap();
        manager.get_cache("foo").unwrap().put("k", json!(1), true);
        manager.create_cache("foo", CacheConfig::new()).unwrap();
        assert_eq!(manager.get_cache("foo").unwrap().get("k"), None);
        assert_eq!(manager.get_cache("foo").unwrap().statistics().puts, 0);
    }
}
