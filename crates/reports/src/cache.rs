//! In-process TTL cache
//!
//! A mutex-guarded map from cache key to value plus expiry instant. Reads
//! that find an expired entry remove it and report a miss. The guard is
//! only ever held for the map operation itself, never across an await.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Aggregates over today's bucket go stale quickly.
pub const TTL_TODAY: Duration = Duration::from_secs(60);
/// Closed historical buckets barely move.
pub const TTL_HISTORICAL: Duration = Duration::from_secs(30 * 60);
/// Latest-users listing, refreshed almost continuously.
pub const TTL_RECENT_USERS: Duration = Duration::from_secs(15);

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL cache keyed by `K`. Values are cloned out on hit.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a live entry, dropping it if its TTL has elapsed.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every entry whose TTL has elapsed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.lock().retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_hit_within_ttl() {
        let cache: TtlCache<&str, i64> = TtlCache::new();
        cache.insert("pending-today", 4, Duration::from_secs(60));
        assert_eq!(cache.get(&"pending-today"), Some(4));
    }

    #[test]
    fn test_miss_after_expiry() {
        let cache: TtlCache<&str, i64> = TtlCache::new();
        cache.insert("pending-today", 4, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"pending-today"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let cache: TtlCache<&str, i64> = TtlCache::new();
        cache.insert("k", 1, Duration::from_secs(60));
        cache.insert("k", 2, Duration::from_secs(60));
        assert_eq!(cache.get(&"k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired_keeps_live_entries() {
        let cache: TtlCache<&str, i64> = TtlCache::new();
        cache.insert("stale", 1, Duration::from_millis(5));
        cache.insert("live", 2, Duration::from_secs(60));
        thread::sleep(Duration::from_millis(20));
        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"live"), Some(2));
    }
}
