use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lettera_core::Clock;
use parking_lot::Mutex;

struct Entry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

/// Bounded map whose entries expire after a fixed TTL.
///
/// When full, expired entries are dropped first, then the oldest insertion.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: chrono::Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            capacity: capacity.max(1),
            clock,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now_utc();
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|entry| now - entry.inserted_at < self.ttl)?;
        if fresh {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            let _ = entries.remove(key);
            None
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now_utc();
        let mut entries = self.entries.lock();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| now - entry.inserted_at < self.ttl);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    let _ = entries.remove(&oldest);
                }
            }
        }
        let _ = entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including any not yet evicted after expiry.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use lettera_core::ManualClock;

    fn clock() -> Arc<ManualClock> {
        let tz = FixedOffset::east_opt(3600).unwrap();
        Arc::new(ManualClock::new(tz.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap()))
    }

    #[test]
    fn entries_expire() {
        let clock = clock();
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60), 8, clock.clone());
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));

        clock.advance(chrono::Duration::seconds(59));
        assert!(cache.contains(&"a"));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let clock = clock();
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(600), 2, clock.clone());
        cache.insert(1, 10);
        clock.advance(chrono::Duration::seconds(1));
        cache.insert(2, 20);
        clock.advance(chrono::Duration::seconds(1));
        cache.insert(3, 30);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(20));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn overwrite_does_not_evict() {
        let clock = clock();
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(600), 2, clock);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(2, 21);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&2), Some(21));
        assert_eq!(cache.remove(&2), Some(21));
    }
}
