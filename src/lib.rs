//! userdir-cache is the client-side caching subsystem of the userdir
//! REST SDK. The SDK's data-store layer uses it to deduplicate reads
//! of immutable resource representations (accounts, groups,
//! directories, applications) fetched over HTTPS+JSON.
//!
//! The crate is called `userdir-cache` and you can depend on it via
//! cargo:
//!
//! ```ini
//! [dependencies.userdir-cache]
//! version = "*"
//! ```
//!
//! # Basic Operation
//!
//! A [`CacheManager`] holds one named [`Cache`] region per resource
//! type. Each region couples a backing store with a TTL/TTI expiration
//! policy and hit/miss accounting; expiration is enforced on read, and
//! nothing runs in the background.
//!
//! ```rust
//! use userdir_cache::{CacheConfig, CacheManager};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let manager = CacheManager::new();
//! let accounts = manager
//!     .create_cache("accounts", CacheConfig::new().set_ttl(Duration::from_secs(300)))
//!     .unwrap();
//!
//! accounts.put(
//!     "https://api.example.com/accounts/x",
//!     json!({"email": "x@example.com"}),
//!     true,
//! );
//! assert!(accounts.get("https://api.example.com/accounts/x").is_some());
//! ```
//!
//! Keys are opaque strings, commonly resource URLs. Values are
//! `serde_json::Value` mappings; the cache assumes nothing about them
//! beyond JSON-serializability.
//!
//! # Expiration Policy
//!
//! Every `get` checks the entry against two thresholds, both
//! defaulting to 300 seconds:
//!
//! * TTL (time-to-live): maximum absolute age since the entry was
//!   created.
//! * TTI (time-to-idle): maximum duration since the entry was last
//!   returned from a hit.
//!
//! A stale entry is deleted, counted as a miss and as an expiration,
//! and the caller falls through to the authoritative remote source.
//!
//! # Backing Stores
//!
//! * [`MemoryStore`]: in-process, bounded to `max_entries` (default
//!   1000), evicting by first insertion order. Always available.
//! * `MemcachedStore`: behind the `memcached` feature. Backend
//!   failures are swallowed and logged, so a dead memcached behaves
//!   like an empty cache.
//! * `RedisStore`: behind the `redis` feature. Entries are stored as
//!   JSON strings with no backend expiry; staleness is enforced
//!   entirely by the cache on read.
//!
//! Custom stores plug in through the [`Store`] trait via
//! [`Cache::with_store`].
//!
//! # Optional Features
//!
//! * `memcached`: enables the memcached backing store (optional)
//! * `redis`: enables the redis backing store (optional)

#![deny(non_camel_case_types)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod entry;
mod errors;
mod manager;
mod statistics;
pub mod store;

pub use crate::cache::{Cache, CacheConfig, StoreKind};
pub use crate::entry::{CacheEntry, TIMESTAMP_FORMAT};
pub use crate::errors::{CacheError, CacheResult, ErrorKind};
pub use crate::manager::CacheManager;
pub use crate::statistics::CacheStatistics;
pub use crate::store::{MemoryStore, Store};

#[cfg(feature = "memcached")]
pub use crate::store::{MemcachedConfig, MemcachedStore};

#[cfg(feature = "redis")]
pub use crate::store::{RedisConfig, RedisStore};
