use std::time::Duration;

use serde_json::Value;

use crate::entry::CacheEntry;
use crate::errors::CacheResult;
use crate::statistics::{CacheStatistics, Statistics};
use crate::store::{MemoryStore, Store, DEFAULT_MAX_ENTRIES};

#[cfg(feature = "memcached")]
use crate::store::{MemcachedConfig, MemcachedStore};
#[cfg(feature = "redis")]
use crate::store::{RedisConfig, RedisStore};

/// Which backing store a cache should be built over.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub enum StoreKind {
    /// In-process bounded store. The default.
    #[default]
    Memory,
    /// Memcached-backed store.
    #[cfg(feature = "memcached")]
    #[cfg_attr(docsrs, doc(cfg(feature = "memcached")))]
    Memcached(MemcachedConfig),
    /// Redis-backed store.
    #[cfg(feature = "redis")]
    #[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
    Redis(RedisConfig),
}

/// Configuration for a single cache region.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    ttl: Duration,
    tti: Duration,
    store: StoreKind,
    max_entries: usize,
}

impl CacheConfig {
    /// Creates a configuration with the defaults: an in-memory store
    /// capped at 1000 entries, and five minutes for both TTL and TTI.
    pub fn new() -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(300),
            tti: Duration::from_secs(300),
            store: StoreKind::Memory,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// Sets the time-to-live: the maximum absolute age of an entry
    /// before a read treats it as expired.
    pub fn set_ttl(mut self, ttl: Duration) -> CacheConfig {
        self.ttl = ttl;
        self
    }

    /// Sets the time-to-idle: the maximum duration between accesses
    /// before a read treats an entry as expired.
    pub fn set_tti(mut self, tti: Duration) -> CacheConfig {
        self.tti = tti;
        self
    }

    /// Selects the backing store.
    pub fn set_store(mut self, store: StoreKind) -> CacheConfig {
        self.store = store;
        self
    }

    /// Sets the entry cap for the in-memory store.
    ///
    /// Only meaningful with [`StoreKind::Memory`]; silently ignored for
    /// the out-of-process stores, so a shared options block can carry
    /// the setting without caring which store each region uses.
    pub fn set_max_entries(mut self, max_entries: usize) -> CacheConfig {
        self.max_entries = max_entries;
        self
    }

    fn build_store(&self) -> CacheResult<Box<dyn Store>> {
        match &self.store {
            StoreKind::Memory => Ok(Box::new(MemoryStore::new(self.max_entries)?)),
            #[cfg(feature = "memcached")]
            StoreKind::Memcached(config) => {
                Ok(Box::new(MemcachedStore::connect(config.clone())?))
            }
            #[cfg(feature = "redis")]
            StoreKind::Redis(config) => Ok(Box::new(RedisStore::connect(config.clone())?)),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> CacheConfig {
        CacheConfig::new()
    }
}

/// One cache region: a backing store coupled with an expiration policy
/// and hit/miss accounting.
///
/// Expiration is enforced on read: `get` checks the entry against the
/// TTL and TTI thresholds and deletes stale entries before reporting a
/// miss. Nothing runs in the background.
///
/// All methods take `&self`; a region can be shared across threads
/// behind an `Arc`.
pub struct Cache {
    store: Box<dyn Store>,
    stats: Statistics,
    ttl: Duration,
    tti: Duration,
}

impl Cache {
    /// Builds a cache over the store described by `config`.
    ///
    /// Fails only on invalid configuration or an unreachable backend;
    /// after construction the cache never raises.
    pub fn new(config: CacheConfig) -> CacheResult<Cache> {
        let store = config.build_store()?;
        Ok(Cache::with_store(store, &config))
    }

    /// Builds a cache over a caller-supplied store.
    pub fn with_store(store: Box<dyn Store>, config: &CacheConfig) -> Cache {
        Cache {
            store,
            stats: Statistics::default(),
            ttl: config.ttl,
            tti: config.tti,
        }
    }

    /// Looks up `key`, enforcing the expiration policy.
    ///
    /// A present-but-stale entry counts as both a miss and an
    /// expiration and is deleted from the store. A live entry is
    /// touched, so its idle clock restarts; for out-of-process stores
    /// the touch is observed only by this process (see
    /// [`Store::refresh`]).
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entry = match self.store.lookup(key) {
            Some(entry) => entry,
            None => {
                self.stats.miss(false);
                return None;
            }
        };
        if entry.is_expired(self.ttl, self.tti) {
            self.stats.miss(true);
            self.store.remove(key);
            return None;
        }
        self.stats.hit();
        entry.touch();
        self.store.refresh(key, &entry);
        Some(entry.value().clone())
    }

    /// Stores `value` under `key` in a fresh entry.
    ///
    /// Pass `new = false` when refreshing a key known to be cached
    /// already, so the logical size tracks distinct keys rather than
    /// writes.
    pub fn put(&self, key: &str, value: Value, new: bool) {
        self.store.assign(key, CacheEntry::new(value));
        self.stats.put(new);
    }

    /// Removes `key`. A no-op if absent.
    pub fn delete(&self, key: &str) {
        self.store.remove(key);
        self.stats.delete();
    }

    /// Empties the store and resets the logical size. Hit/miss/put
    /// counters are preserved.
    pub fn clear(&self) {
        self.store.clear();
        self.stats.clear();
    }

    /// Number of entries in the backing store. Authoritative, unlike
    /// the `size` field of the statistics snapshot, which tracks the
    /// caller's put/delete bookkeeping.
    pub fn size(&self) -> usize {
        self.store.length()
    }

    /// Point-in-time statistics for this region.
    pub fn statistics(&self) -> CacheStatistics {
        self.stats.snapshot()
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The configured time-to-idle.
    pub fn tti(&self) -> Duration {
        self.tti
    }
}
