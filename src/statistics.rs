use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Internal accounting for a single cache.
///
/// Counters use relaxed atomics and are not transactionally coupled to
/// store mutations, so totals may drift slightly under contention.
/// `puts`, `hits`, `misses` and `expirations` are monotonic; `size`
/// is floored at zero.
#[derive(Default, Debug)]
pub(crate) struct Statistics {
    puts: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    size: AtomicU64,
}

impl Statistics {
    /// Records a write. `new` distinguishes a first insert (which grows
    /// `size`) from a refresh of an existing key (which does not).
    pub(crate) fn put(&self, new: bool) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        if new {
            self.size.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a miss; `expired` marks the miss as caused by a
    /// present-but-stale entry and additionally bumps `expirations`.
    pub(crate) fn miss(&self, expired: bool) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        if expired {
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn delete(&self) {
        // Floored decrement: deleting keys the cache never counted must
        // not drive the logical size negative.
        let _ = self
            .size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |size| {
                size.checked_sub(1)
            });
    }

    pub(crate) fn clear(&self) {
        self.size.store(0, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStatistics {
        CacheStatistics {
            puts: self.puts.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time statistics snapshot for one cache region.
///
/// Serializable so hosts can export it as telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    /// Number of writes, counting refreshes of existing keys.
    pub puts: u64,
    /// Number of `get` calls answered from the cache.
    pub hits: u64,
    /// Number of `get` calls the cache could not answer.
    pub misses: u64,
    /// Misses caused specifically by a present-but-stale entry.
    pub expirations: u64,
    /// Logical count of distinct keys written and not yet deleted.
    pub size: u64,
}
