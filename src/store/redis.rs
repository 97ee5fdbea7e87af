//! Redis-backed store.
//!
//! Entries are persisted as UTF-8 JSON strings of the entry wire
//! shape. Unlike the memcached store, no backend-level expiry is set:
//! redis holds entries until the cache's own TTL/TTI enforcement
//! removes them on read. This asymmetry is deliberate and shared with
//! the service's other SDK clients.
//!
//! Runtime backend failures are logged and surfaced as "absent", the
//! same degradation the memcached store applies; only construction
//! fails loudly.

use std::sync::{Mutex, MutexGuard};

use redis::{Commands, Connection};
use serde_json::Value;

use crate::entry::CacheEntry;
use crate::errors::CacheResult;
use crate::store::Store;

/// Connection parameters for [`RedisStore`].
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Backend host. Defaults to `localhost`.
    pub host: String,
    /// Backend port. Defaults to `6379`.
    pub port: u16,
    /// Database index. Defaults to `0`.
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> RedisConfig {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}

/// Store writing through to a redis database.
pub struct RedisStore {
    connection: Mutex<Connection>,
}

impl RedisStore {
    /// Opens a connection to the configured database. Fails fast on
    /// invalid parameters or an unreachable server.
    pub fn connect(config: RedisConfig) -> CacheResult<RedisStore> {
        let client = redis::Client::open(format!(
            "redis://{}:{}/{}",
            config.host, config.port, config.db
        ))?;
        let connection = client.get_connection()?;
        Ok(RedisStore {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store for RedisStore {
    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let raw: Option<String> = match self.connection().get(key) {
            Ok(raw) => raw,
            Err(err) => {
                log::warn!("redis lookup failed for {key:?}: {err}");
                return None;
            }
        };
        let raw = raw?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(wire) => Some(CacheEntry::parse(&wire)),
            Err(err) => {
                log::debug!("discarding undecodable redis entry for {key:?}: {err}");
                None
            }
        }
    }

    fn assign(&self, key: &str, entry: CacheEntry) {
        let payload = match serde_json::to_string(&entry.to_wire()) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("could not serialize entry for {key:?}: {err}");
                return;
            }
        };
        if let Err(err) = self.connection().set::<_, _, ()>(key, payload) {
            log::warn!("redis write failed for {key:?}: {err}");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.connection().del::<_, ()>(key) {
            log::warn!("redis delete failed for {key:?}: {err}");
        }
    }

    fn clear(&self) {
        if let Err(err) = redis::cmd("FLUSHDB").exec(&mut *self.connection()) {
            log::warn!("redis flush failed: {err}");
        }
    }

    fn length(&self) -> usize {
        match redis::cmd("DBSIZE").query::<i64>(&mut *self.connection()) {
            Ok(count) => count.max(0) as usize,
            Err(err) => {
                log::warn!("redis dbsize failed: {err}");
                0
            }
        }
    }
}
