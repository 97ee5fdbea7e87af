//! Cache entries: a payload plus the two timestamps the expiration
//! policy is computed from.

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Timelike, Utc};
use serde_json::{json, Value};

/// Timestamp layout used when entries cross a process boundary.
/// Six fractional digits, space separator. The format is fixed; other
/// SDK clients for the same service write the same shape.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current UTC wall-clock time, truncated to microsecond precision.
///
/// Truncating at construction time keeps the wire format lossless:
/// formatting with [`TIMESTAMP_FORMAT`] and parsing back yields the
/// identical instant.
pub(crate) fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    let micros = now.nanosecond() / 1_000;
    // with_nanosecond only fails for values >= 2_000_000_000.
    now.with_nanosecond(micros * 1_000).unwrap_or(now)
}

/// Largest representable deadline for a timestamp and a duration.
///
/// Saturates instead of overflowing so that "effectively infinite"
/// TTL/TTI values behave as never-expiring.
fn deadline(at: NaiveDateTime, after: Duration) -> NaiveDateTime {
    TimeDelta::from_std(after)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(NaiveDateTime::MAX)
}

/// A single cached value together with its creation and last-access
/// timestamps.
///
/// Entries are created by [`Cache::put`](crate::Cache::put), touched on
/// every hit and destroyed when the cache evicts them (expiry, explicit
/// delete, clear, or the memory store's size bound).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    value: Value,
    created_at: NaiveDateTime,
    last_accessed_at: NaiveDateTime,
}

impl CacheEntry {
    /// Creates an entry whose timestamps are both "now".
    pub fn new(value: Value) -> CacheEntry {
        let created_at = now();
        CacheEntry {
            value,
            created_at,
            last_accessed_at: created_at,
        }
    }

    /// Creates an entry with explicit timestamps.
    pub fn with_timestamps(
        value: Value,
        created_at: NaiveDateTime,
        last_accessed_at: NaiveDateTime,
    ) -> CacheEntry {
        CacheEntry {
            value,
            created_at,
            last_accessed_at,
        }
    }

    /// The cached payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// When the entry was created.
    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    /// When the entry was last returned from a cache hit.
    pub fn last_accessed_at(&self) -> NaiveDateTime {
        self.last_accessed_at
    }

    /// Records an access by moving `last_accessed_at` to "now".
    pub fn touch(&mut self) {
        self.last_accessed_at = now();
    }

    /// Whether the entry has outlived either expiration threshold.
    ///
    /// True iff `now >= created_at + ttl` or
    /// `now >= last_accessed_at + tti`. Both comparisons are inclusive:
    /// an entry is already expired at the exact deadline.
    pub fn is_expired(&self, ttl: Duration, tti: Duration) -> bool {
        let now = now();
        now >= deadline(self.created_at, ttl) || now >= deadline(self.last_accessed_at, tti)
    }

    /// Serializes the entry into the wire shape used by the
    /// out-of-process stores:
    ///
    /// ```json
    /// {
    ///   "value": <payload>,
    ///   "created_at": "YYYY-MM-DD HH:MM:SS.ffffff",
    ///   "last_accessed_at": "YYYY-MM-DD HH:MM:SS.ffffff"
    /// }
    /// ```
    pub fn to_wire(&self) -> Value {
        json!({
            "value": self.value,
            "created_at": self.created_at.format(TIMESTAMP_FORMAT).to_string(),
            "last_accessed_at": self.last_accessed_at.format(TIMESTAMP_FORMAT).to_string(),
        })
    }

    /// Rebuilds an entry from its wire shape. Inverse of [`to_wire`].
    ///
    /// This never fails: a timestamp field that is missing or does not
    /// parse independently defaults to "now", and a non-object input
    /// becomes an entry whose payload is that input. Stale external
    /// data degrades to a recently-created entry rather than an error.
    ///
    /// [`to_wire`]: CacheEntry::to_wire
    pub fn parse(wire: &Value) -> CacheEntry {
        match wire.as_object() {
            Some(fields) => CacheEntry {
                value: fields.get("value").cloned().unwrap_or(Value::Null),
                created_at: parse_timestamp(fields.get("created_at")),
                last_accessed_at: parse_timestamp(fields.get("last_accessed_at")),
            },
            None => CacheEntry::new(wire.clone()),
        }
    }
}

/// Parses one wire timestamp, defaulting to "now" on any failure.
///
/// Accepts truncated fractional precision (the `%.f` specifier matches
/// zero to nine digits), so peers that write fewer than six digits
/// still round-trip.
fn parse_timestamp(field: Option<&Value>) -> NaiveDateTime {
    field
        .and_then(Value::as_str)
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
        .unwrap_or_else(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(created: &str, accessed: &str) -> CacheEntry {
        CacheEntry::with_timestamps(
            json!({"a": 1}),
            NaiveDateTime::parse_from_str(created, TIMESTAMP_FORMAT).unwrap(),
            NaiveDateTime::parse_from_str(accessed, TIMESTAMP_FORMAT).unwrap(),
        )
    }

    #[test]
    fn touch_moves_last_access_forward() {
        let mut entry = CacheEntry::new(json!("X"));
        let before = entry.last_accessed_at();
        std::thread::sleep(Duration::from_millis(2));
        entry.touch();
        assert!(entry.last_accessed_at() > before);
        assert_eq!(entry.created_at(), before, "created_at must not move");
    }

    #[test]
    fn fresh_entry_is_not_expired() {
        let entry = CacheEntry::new(json!("X"));
        assert!(!entry.is_expired(Duration::from_secs(300), Duration::from_secs(300)));
    }

    #[test]
    fn expired_at_exact_ttl_deadline() {
        // created_at exactly `ttl` ago; the comparison is inclusive so
        // the entry is already expired at the deadline.
        let created = now() - TimeDelta::try_seconds(300).unwrap();
        let entry = CacheEntry::with_timestamps(json!("X"), created, now());
        assert!(entry.is_expired(Duration::from_secs(300), Duration::from_secs(86400)));
        assert!(!entry.is_expired(Duration::from_secs(86400), Duration::from_secs(86400)));
    }

    #[test]
    fn expired_by_idle_time_alone() {
        let accessed = now() - TimeDelta::try_seconds(61).unwrap();
        let entry = CacheEntry::with_timestamps(json!("X"), now(), accessed);
        assert!(entry.is_expired(Duration::from_secs(86400), Duration::from_secs(60)));
        assert!(!entry.is_expired(Duration::from_secs(86400), Duration::from_secs(120)));
    }

    #[test]
    fn huge_thresholds_never_expire() {
        let entry = CacheEntry::new(json!("X"));
        assert!(!entry.is_expired(Duration::MAX, Duration::MAX));
    }

    #[test]
    fn wire_round_trip_preserves_fields() {
        let entry = entry_at("2013-01-01 09:30:00.000000", "2013-01-01 10:29:00.000000");
        let parsed = CacheEntry::parse(&entry.to_wire());
        assert_eq!(parsed, entry);
    }

    #[test]
    fn wire_round_trip_of_fresh_entry() {
        // `now` is truncated to microseconds, so the six-digit format
        // loses nothing.
        let entry = CacheEntry::new(json!({"href": "https://api.example.com/accounts/x"}));
        assert_eq!(CacheEntry::parse(&entry.to_wire()), entry);
    }

    #[test]
    fn wire_timestamps_carry_six_fractional_digits() {
        let entry = entry_at("2013-01-01 09:30:00.000000", "2013-01-01 10:29:00.000000");
        let wire = entry.to_wire();
        assert_eq!(wire["created_at"], json!("2013-01-01 09:30:00.000000"));
        assert_eq!(wire["last_accessed_at"], json!("2013-01-01 10:29:00.000000"));
    }

    #[test]
    fn parse_accepts_truncated_fractional_precision() {
        let wire = json!({
            "value": "X",
            "created_at": "2013-01-01 09:30:00.123",
            "last_accessed_at": "2013-01-01 10:29:00",
        });
        let parsed = CacheEntry::parse(&wire);
        assert_eq!(
            parsed.created_at(),
            NaiveDateTime::parse_from_str("2013-01-01 09:30:00.123000", TIMESTAMP_FORMAT).unwrap()
        );
    }

    #[test]
    fn parse_defaults_bad_timestamps_to_now() {
        let before = now();
        let wire = json!({
            "value": "X",
            "created_at": "not a timestamp",
            "last_accessed_at": 42,
        });
        let parsed = CacheEntry::parse(&wire);
        let after = now();
        assert_eq!(parsed.value(), &json!("X"));
        assert!(parsed.created_at() >= before && parsed.created_at() <= after);
        assert!(parsed.last_accessed_at() >= before && parsed.last_accessed_at() <= after);
    }

    #[test]
    fn parse_of_non_object_keeps_it_as_value() {
        let parsed = CacheEntry::parse(&json!("just a string"));
        assert_eq!(parsed.value(), &json!("just a string"));
    }
}
