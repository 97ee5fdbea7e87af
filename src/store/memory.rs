use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::entry::CacheEntry;
use crate::errors::{CacheResult, ErrorKind};
use crate::store::Store;

/// Cap applied when no explicit `max_entries` is configured.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in first-insertion order; the eviction queue.
    order: VecDeque<String>,
}

/// In-process store bounded by an entry cap.
///
/// When an insert pushes the store over `max_entries`, entries are
/// evicted oldest-first-insertion first. Re-assigning an existing key
/// keeps its original position, so the policy is FIFO by first
/// insertion rather than LRU: repeated writes to the same key do not
/// refresh its eviction priority.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    max_entries: usize,
}

impl MemoryStore {
    /// Creates a store holding at most `max_entries` entries.
    ///
    /// Fails with [`ErrorKind::InvalidConfig`](crate::ErrorKind) if
    /// `max_entries` is zero.
    pub fn new(max_entries: usize) -> CacheResult<MemoryStore> {
        if max_entries < 1 {
            return Err((ErrorKind::InvalidConfig, "max_entries must be at least 1").into());
        }
        Ok(MemoryStore {
            inner: Mutex::new(Inner::default()),
            max_entries,
        })
    }

    /// The configured entry cap.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Locks the map, recovering from poisoning: a panic mid-mutation
    /// can at worst leave a stale or missing entry, which callers
    /// already tolerate.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> MemoryStore {
        // DEFAULT_MAX_ENTRIES is non-zero.
        MemoryStore::new(DEFAULT_MAX_ENTRIES).unwrap()
    }
}

impl Store for MemoryStore {
    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    fn assign(&self, key: &str, entry: CacheEntry) {
        let mut inner = self.lock();
        if inner.entries.insert(key.to_string(), entry).is_none() {
            inner.order.push_back(key.to_string());
        }
        while inner.entries.len() > self.max_entries {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|queued| queued != key);
        }
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    fn length(&self) -> usize {
        self.lock().entries.len()
    }

    fn refresh(&self, key: &str, entry: &CacheEntry) {
        // In-place update; the key keeps its slot in the eviction
        // queue.
        if let Some(stored) = self.lock().entries.get_mut(key) {
            *stored = entry.clone();
        }
    }
}
