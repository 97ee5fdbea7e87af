//! Memcached-backed store.
//!
//! Every backend interaction is wrapped in a best-effort guard: any
//! network or protocol failure is logged and converted to the neutral
//! result ("absent" for reads, no-op for writes), so a dead memcached
//! degrades the cache to an empty cache instead of breaking callers.
//!
//! Entries travel in a two-flag scheme shared with the service's other
//! SDK clients: flag `1` marks raw string bytes, flag `2` marks the
//! JSON wire shape of an entry. Other flag values are undefined and
//! refuse to decode (see [`decode`]).

use std::io::{self, Write};
use std::time::Duration;

use serde_json::Value;

use crate::entry::CacheEntry;
use crate::errors::CacheResult;
use crate::store::Store;

const FLAG_STRING: u32 = 1;
const FLAG_JSON: u32 = 2;

/// Connection parameters for [`MemcachedStore`].
///
/// Some of the service's other SDK clients expose an `ignore_exc`
/// toggle controlling whether backend failures raise or read as
/// misses. There is no such knob here: failures are always swallowed
/// and logged, because the [`Store`] contract requires the store to be
/// infallible once constructed.
#[derive(Clone, Debug)]
pub struct MemcachedConfig {
    /// Backend host. Defaults to `localhost`.
    pub host: String,
    /// Backend port. Defaults to `11211`.
    pub port: u16,
    /// TCP connect timeout. Defaults to one second.
    pub connect_timeout: Duration,
    /// Socket read/write timeout. Defaults to one second.
    pub read_timeout: Duration,
    /// Whether to set TCP_NODELAY on the connection. Defaults to true.
    pub tcp_nodelay: bool,
    /// Prefix prepended to every key before it reaches the backend.
    pub key_prefix: String,
    /// Backend-enforced expiry in seconds, forwarded as memcached's
    /// `expire` argument on every write. This evicts server-side,
    /// independently of the cache-level TTL/TTI policy. Defaults to
    /// 300 seconds.
    pub ttl_seconds: u32,
}

impl Default for MemcachedConfig {
    fn default() -> MemcachedConfig {
        MemcachedConfig {
            host: "localhost".to_string(),
            port: 11211,
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            tcp_nodelay: true,
            key_prefix: String::new(),
            ttl_seconds: 300,
        }
    }
}

/// The slice of the memcached protocol this store needs. Carved out as
/// a trait so the guard logic is testable against a failing backend.
pub(crate) trait MemcachedBackend: Send + Sync {
    fn fetch(&self, key: &str) -> CacheResult<Option<(Vec<u8>, u32)>>;
    fn put(&self, key: &str, payload: &[u8], flags: u32, expire: u32) -> CacheResult<()>;
    fn delete(&self, key: &str) -> CacheResult<()>;
    fn flush(&self) -> CacheResult<()>;
    fn item_count(&self) -> CacheResult<usize>;
}

/// Payload wrapper carrying an explicit flag value to the client.
struct FlaggedPayload<'a> {
    bytes: &'a [u8],
    flags: u32,
}

impl<W: Write> memcache::ToMemcacheValue<W> for FlaggedPayload<'_> {
    fn get_flags(&self) -> u32 {
        self.flags
    }

    fn get_length(&self) -> usize {
        self.bytes.len()
    }

    fn write_to(&self, stream: &mut W) -> io::Result<()> {
        stream.write_all(self.bytes)
    }
}

impl MemcachedBackend for memcache::Client {
    fn fetch(&self, key: &str) -> CacheResult<Option<(Vec<u8>, u32)>> {
        Ok(self.get::<(Vec<u8>, u32)>(key)?)
    }

    fn put(&self, key: &str, payload: &[u8], flags: u32, expire: u32) -> CacheResult<()> {
        Ok(self.set(
            key,
            FlaggedPayload {
                bytes: payload,
                flags,
            },
            expire,
        )?)
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        memcache::Client::delete(self, key)?;
        Ok(())
    }

    fn flush(&self) -> CacheResult<()> {
        Ok(memcache::Client::flush(self)?)
    }

    fn item_count(&self) -> CacheResult<usize> {
        // Summed across servers; `curr_items` is what the daemon itself
        // reports, so the count is approximate by contract.
        let mut total = 0usize;
        for (_, server_stats) in self.stats()? {
            if let Some(count) = server_stats.get("curr_items") {
                total += count.parse::<usize>().unwrap_or(0);
            }
        }
        Ok(total)
    }
}

/// Store writing through to a memcached server.
pub struct MemcachedStore {
    backend: Box<dyn MemcachedBackend>,
    key_prefix: String,
    ttl_seconds: u32,
}

impl MemcachedStore {
    /// Connects to the configured server. Fails fast if the server is
    /// unreachable or the parameters are invalid; once constructed, no
    /// backend failure ever escapes this store.
    pub fn connect(config: MemcachedConfig) -> CacheResult<MemcachedStore> {
        let url = format!(
            "memcache://{}:{}?connect_timeout={}&tcp_nodelay={}",
            config.host,
            config.port,
            config.connect_timeout.as_secs_f64(),
            config.tcp_nodelay,
        );
        let client = memcache::Client::connect(url)?;
        client.set_read_timeout(Some(config.read_timeout))?;
        client.set_write_timeout(Some(config.read_timeout))?;
        Ok(MemcachedStore::with_backend(Box::new(client), config))
    }

    pub(crate) fn with_backend(
        backend: Box<dyn MemcachedBackend>,
        config: MemcachedConfig,
    ) -> MemcachedStore {
        MemcachedStore {
            backend,
            key_prefix: config.key_prefix,
            ttl_seconds: config.ttl_seconds,
        }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

impl Store for MemcachedStore {
    fn lookup(&self, key: &str) -> Option<CacheEntry> {
        match self.backend.fetch(&self.prefixed(key)) {
            Ok(Some((payload, flags))) => decode(&payload, flags),
            Ok(None) => None,
            Err(err) => {
                log::warn!("memcached lookup failed for {key:?}: {err}");
                None
            }
        }
    }

    fn assign(&self, key: &str, entry: CacheEntry) {
        let (payload, flags) = match encode(&entry) {
            Ok(encoded) => encoded,
            Err(err) => {
                log::warn!("could not serialize entry for {key:?}: {err}");
                return;
            }
        };
        if let Err(err) = self
            .backend
            .put(&self.prefixed(key), &payload, flags, self.ttl_seconds)
        {
            log::warn!("memcached write failed for {key:?}: {err}");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(err) = self.backend.delete(&self.prefixed(key)) {
            log::warn!("memcached delete failed for {key:?}: {err}");
        }
    }

    fn clear(&self) {
        if let Err(err) = self.backend.flush() {
            log::warn!("memcached flush failed: {err}");
        }
    }

    fn length(&self) -> usize {
        self.backend.item_count().unwrap_or_else(|err| {
            log::warn!("memcached stats failed: {err}");
            0
        })
    }
}

fn encode(entry: &CacheEntry) -> CacheResult<(Vec<u8>, u32)> {
    // Entries always go out as their JSON wire shape; the raw-string
    // flag exists for data written by peers that store bare strings.
    Ok((serde_json::to_vec(&entry.to_wire())?, FLAG_JSON))
}

/// Decodes a flagged payload back into an entry.
///
/// Undecodable JSON degrades to a miss. An unknown flag panics: it
/// means another writer is using an incompatible scheme, and serving
/// silently corrupt entries is worse than crashing.
fn decode(payload: &[u8], flags: u32) -> Option<CacheEntry> {
    match flags {
        FLAG_STRING => Some(CacheEntry::new(Value::String(
            String::from_utf8_lossy(payload).into_owned(),
        ))),
        FLAG_JSON => match serde_json::from_slice::<Value>(payload) {
            Ok(wire) => Some(CacheEntry::parse(&wire)),
            Err(err) => {
                log::debug!("discarding undecodable memcached entry: {err}");
                None
            }
        },
        other => panic!("unknown memcached flag {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Backend that fails every call, standing in for a dead server.
    struct FailingBackend;

    fn backend_down<T>() -> CacheResult<T> {
        Err((ErrorKind::BackendUnavailable, "connection refused").into())
    }

    impl MemcachedBackend for FailingBackend {
        fn fetch(&self, _: &str) -> CacheResult<Option<(Vec<u8>, u32)>> {
            backend_down()
        }
        fn put(&self, _: &str, _: &[u8], _: u32, _: u32) -> CacheResult<()> {
            backend_down()
        }
        fn delete(&self, _: &str) -> CacheResult<()> {
            backend_down()
        }
        fn flush(&self) -> CacheResult<()> {
            backend_down()
        }
        fn item_count(&self) -> CacheResult<usize> {
            backend_down()
        }
    }

    /// In-memory fake recording exactly what reaches the wire.
    #[derive(Default)]
    struct RecordingBackend {
        data: Mutex<HashMap<String, (Vec<u8>, u32, u32)>>,
    }

    impl MemcachedBackend for RecordingBackend {
        fn fetch(&self, key: &str) -> CacheResult<Option<(Vec<u8>, u32)>> {
            Ok(self
                .data
                .lock()
                .unwrap()
                .get(key)
                .map(|(payload, flags, _)| (payload.clone(), *flags)))
        }
        fn put(&self, key: &str, payload: &[u8], flags: u32, expire: u32) -> CacheResult<()> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), (payload.to_vec(), flags, expire));
            Ok(())
        }
        fn delete(&self, key: &str) -> CacheResult<()> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }
        fn flush(&self) -> CacheResult<()> {
            self.data.lock().unwrap().clear();
            Ok(())
        }
        fn item_count(&self) -> CacheResult<usize> {
            Ok(self.data.lock().unwrap().len())
        }
    }

    impl MemcachedBackend for Arc<RecordingBackend> {
        fn fetch(&self, key: &str) -> CacheResult<Option<(Vec<u8>, u32)>> {
            (**self).fetch(key)
        }
        fn put(&self, key: &str, payload: &[u8], flags: u32, expire: u32) -> CacheResult<()> {
            (**self).put(key, payload, flags, expire)
        }
        fn delete(&self, key: &str) -> CacheResult<()> {
            (**self).delete(key)
        }
        fn flush(&self) -> CacheResult<()> {
            (**self).flush()
        }
        fn item_count(&self) -> CacheResult<usize> {
            (**self).item_count()
        }
    }

    fn failing_store() -> MemcachedStore {
        MemcachedStore::with_backend(Box::new(FailingBackend), MemcachedConfig::default())
    }

    #[test]
    fn dead_backend_is_swallowed() {
        let store = failing_store();
        assert!(store.lookup("k").is_none());
        store.assign("k", CacheEntry::new(json!("v")));
        store.remove("k");
        store.clear();
        assert_eq!(store.length(), 0);
    }

    #[test]
    fn entries_round_trip_with_json_flag_and_expire() {
        let backend = Arc::new(RecordingBackend::default());
        let config = MemcachedConfig {
            ttl_seconds: 120,
            ..MemcachedConfig::default()
        };
        let store = MemcachedStore::with_backend(Box::new(Arc::clone(&backend)), config);
        let entry = CacheEntry::new(json!({"href": "https://api.example.com/accounts/x"}));
        store.assign("k", entry.clone());
        assert_eq!(store.lookup("k"), Some(entry));
        assert_eq!(store.length(), 1);

        // Inspect what actually hit the wire.
        let recorded = backend.data.lock().unwrap();
        let (payload, flags, expire) = recorded.get("k").unwrap();
        assert_eq!(*flags, FLAG_JSON);
        assert_eq!(*expire, 120);
        let wire: Value = serde_json::from_slice(payload).unwrap();
        assert!(wire["created_at"].is_string());
    }

    #[test]
    fn key_prefix_reaches_the_wire() {
        let config = MemcachedConfig {
            key_prefix: "userdir:".to_string(),
            ..MemcachedConfig::default()
        };
        let backend = Arc::new(RecordingBackend::default());
        let store = MemcachedStore::with_backend(Box::new(Arc::clone(&backend)), config);
        store.assign("accounts/x", CacheEntry::new(json!("v")));
        assert!(store.lookup("accounts/x").is_some());
        let recorded = backend.data.lock().unwrap();
        assert!(recorded.contains_key("userdir:accounts/x"));
        assert!(!recorded.contains_key("accounts/x"));
    }

    #[test]
    fn raw_string_flag_decodes_to_string_value() {
        let entry = decode(b"plain", FLAG_STRING).unwrap();
        assert_eq!(entry.value(), &json!("plain"));
    }

    #[test]
    fn undecodable_json_degrades_to_miss() {
        assert!(decode(b"{not json", FLAG_JSON).is_none());
    }

    #[test]
    #[should_panic(expected = "unknown memcached flag")]
    fn unknown_flag_panics() {
        decode(b"whatever", 7);
    }
}
