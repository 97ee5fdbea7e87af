//! Backing stores for [`Cache`](crate::Cache).
//!
//! A store is an opaque key-to-entry container. The in-process
//! [`MemoryStore`] is always available; the memcached and redis
//! variants are compiled in with the `memcached` and `redis` cargo
//! features respectively.

mod memory;

#[cfg(feature = "memcached")]
#[cfg_attr(docsrs, doc(cfg(feature = "memcached")))]
pub mod memcached;

#[cfg(feature = "redis")]
#[cfg_attr(docsrs, doc(cfg(feature = "redis")))]
pub mod redis;

pub use memory::{MemoryStore, DEFAULT_MAX_ENTRIES};

#[cfg(feature = "memcached")]
pub use memcached::{MemcachedConfig, MemcachedStore};

#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisStore};

use crate::entry::CacheEntry;

/// The container behind a cache.
///
/// All operations are infallible from the cache's point of view: a
/// store whose backend fails must report the failure as "absent" (or a
/// no-op) so the cache degrades to an empty cache and callers fall
/// through to the authoritative remote source.
pub trait Store: Send + Sync {
    /// Returns the entry stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under `key`, overwriting any previous entry.
    fn assign(&self, key: &str, entry: CacheEntry);

    /// Removes `key`. Silent if absent.
    fn remove(&self, key: &str);

    /// Empties everything the store owns.
    fn clear(&self);

    /// Number of entries currently held. Approximate is acceptable for
    /// out-of-process stores.
    fn length(&self) -> usize;

    /// Write-back hook invoked after a hit refreshes an entry's
    /// last-access timestamp.
    ///
    /// The default is a no-op, which for out-of-process stores means a
    /// touch is observed only by this process. The memory store
    /// overrides this to update the stored entry in place, without
    /// changing its eviction position.
    fn refresh(&self, key: &str, entry: &CacheEntry) {
        let _ = (key, entry);
    }
}
