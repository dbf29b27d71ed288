//! In-process cache tier.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Result of a local lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalLookup {
    /// Live entry, JSON payload.
    Hit(String),
    /// Entry present but past its expiry.
    Expired,
    Missing,
}

/// Map of JSON payloads with absolute expiry times behind one lock.
///
/// Expired entries stay in the map until something removes them: a
/// [`remove_if_expired`](Self::remove_if_expired) after a lookup, or a
/// [`purge_expired`](Self::purge_expired) sweep.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl LocalCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key` without modifying the map.
    pub fn get(&self, key: &str) -> LocalLookup {
        let now = Instant::now();
        match self.entries.read().get(key) {
            Some(entry) if entry.is_expired(now) => LocalLookup::Expired,
            Some(entry) => LocalLookup::Hit(entry.payload.clone()),
            None => LocalLookup::Missing,
        }
    }

    /// Stores `payload` until `ttl` from now, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, payload: String, ttl: Duration) {
        let entry = CacheEntry {
            payload,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.into(), entry);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Removes `key` only if it is still expired.
    ///
    /// A write that refreshed the entry after the lookup is kept.
    pub fn remove_if_expired(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Removes every key starting with `prefix`; returns how many.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Removes every expired entry; returns how many.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Entries currently stored, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let cache = LocalCache::new();
        cache.insert("book:1", "{\"a\":1}".to_string(), Duration::from_secs(10));
        assert_eq!(cache.get("book:1"), LocalLookup::Hit("{\"a\":1}".to_string()));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("book:1"), LocalLookup::Expired);
        assert_eq!(cache.get("book:2"), LocalLookup::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_if_expired_keeps_refreshed_entry() {
        let cache = LocalCache::new();
        cache.insert("book:1", "old".to_string(), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.insert("book:1", "new".to_string(), Duration::from_secs(60));
        assert!(!cache.remove_if_expired("book:1"));
        assert_eq!(cache.get("book:1"), LocalLookup::Hit("new".to_string()));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.remove_if_expired("book:1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_prefix_only_touches_namespace() {
        let cache = LocalCache::new();
        let ttl = Duration::from_secs(60);
        cache.insert("book:1", String::new(), ttl);
        cache.insert("books:abc", String::new(), ttl);
        cache.insert("books:def", String::new(), ttl);

        assert_eq!(cache.remove_prefix("books:"), 2);
        assert_eq!(cache.len(), 1);
        assert!(matches!(cache.get("book:1"), LocalLookup::Hit(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = LocalCache::new();
        cache.insert("short", String::new(), Duration::from_secs(1));
        cache.insert("long", String::new(), Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
