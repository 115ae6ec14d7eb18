use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

/// Time source for the cache. Injected so tests can advance time
/// deterministically instead of sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    stored_at: DateTime<Utc>,
}

/// Last-known-good store keyed by source name. Entries are written only on
/// verified success and never deleted; a stale entry is simply not served
/// until the next success overwrites it.
///
/// The cache stores no TTLs itself; callers pick the TTL per read, so one
/// store can hold hour-scale cost data next to minute-scale inventory data.
pub struct TtlCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stored value only while `now - stored_at <= ttl`.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        let now = self.clock.now();
        let max_age = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if now.signed_duration_since(entry.stored_at) <= max_age {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Unconditional overwrite; `stored_at` resets to now. Racing writers
    /// resolve last-write-wins, entries are never left torn.
    pub fn set(&self, key: &str, value: Value) {
        let entry = Entry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries.lock().insert(key.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Clock whose reading only moves when the test says so.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn starting_at(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock();
            *now += chrono::Duration::from_std(by).expect("advance fits chrono range");
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("valid epoch")
            .with_timezone(&Utc)
    }

    #[test]
    fn round_trip_returns_value_unchanged() {
        let cache = TtlCache::new();
        let payload = json!({"total": 42.17, "currency": "USD", "history": [1, 2, 3]});
        cache.set("costData", payload.clone());
        assert_eq!(cache.get("costData", Duration::from_secs(60)), Some(payload));
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache = TtlCache::with_clock(clock.clone());
        cache.set("gptUsage", json!({"tokens": 9000}));

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.get("gptUsage", Duration::from_secs(60)), None);
        // Entry survives expiry; a longer TTL class still sees it.
        assert_eq!(cache.len(), 1);
        assert!(cache.get("gptUsage", Duration::from_secs(3600)).is_some());
    }

    #[test]
    fn read_exactly_at_ttl_is_still_fresh() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache = TtlCache::with_clock(clock.clone());
        cache.set("costData", json!({"total": 1.0}));

        clock.advance(Duration::from_secs(60));
        assert!(cache.get("costData", Duration::from_secs(60)).is_some());
    }

    #[test]
    fn failed_refresh_leaves_prior_value_intact() {
        let cache = TtlCache::new();
        cache.set("costData", json!({"total": 10.0}));
        // A failed fetch never calls set(); the old value must still read.
        assert_eq!(
            cache.get("costData", Duration::from_secs(60)),
            Some(json!({"total": 10.0}))
        );
    }

    #[test]
    fn later_success_overwrites_stale_entry() {
        let clock = Arc::new(ManualClock::starting_at(epoch()));
        let cache = TtlCache::with_clock(clock.clone());
        cache.set("resources", json!({"count": 5}));

        clock.advance(Duration::from_secs(3600));
        assert_eq!(cache.get("resources", Duration::from_secs(60)), None);

        cache.set("resources", json!({"count": 7}));
        assert_eq!(
            cache.get("resources", Duration::from_secs(60)),
            Some(json!({"count": 7}))
        );
    }

    #[test]
    fn keys_are_independent() {
        let cache = TtlCache::new();
        cache.set("a", json!(1));
        cache.set("b", json!(2));
        assert_eq!(cache.get("a", Duration::from_secs(60)), Some(json!(1)));
        assert_eq!(cache.get("b", Duration::from_secs(60)), Some(json!(2)));
        assert_eq!(cache.get("c", Duration::from_secs(60)), None);
    }
}
