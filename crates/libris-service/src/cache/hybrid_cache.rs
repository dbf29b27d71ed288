//! Two-tier book cache: external tier first, in-process tier as fallback
//! and mirror.
//!
//! The external tier is probed once at construction. If the probe fails
//! the cache stays local-only for its whole lifetime and runs a background
//! sweeper that evicts expired local entries. External-tier failures are
//! logged and turned into misses or no-ops; they never reach callers.

use super::cache_keys::{self, BOOK_LIST_PATTERN, BOOK_LIST_PREFIX, BOOK_PATTERN};
use super::local_cache::{LocalCache, LocalLookup};
use super::{CacheExt, CacheInterface, RedisCacheService};
use crate::dto::BooksListResponse;
use libris_config::CacheConfig;
use libris_core::{Book, BookFilter, BookId};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Shortest sweeper period accepted.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// TTLs and sweeper period.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Lifetime of local-tier entries.
    pub ttl: Duration,
    /// Period of the local expiry sweeper.
    pub cleanup_interval: Duration,
    /// External-tier lifetime of single books.
    pub book_ttl: Duration,
    /// External-tier lifetime of list pages.
    pub book_list_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            cleanup_interval: config.cleanup_interval(),
            book_ttl: config.book_ttl(),
            book_list_ttl: config.book_list_ttl(),
        }
    }
}

/// Tier selection, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// External tier first, local tier as fallback.
    Hybrid,
    LocalOnly,
}

/// Snapshot of the cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Local entries, expired ones not yet removed included.
    pub items: usize,
    /// Entries removed by the sweeper.
    pub evictions: u64,
    pub external_hits: u64,
    pub local_hits: u64,
}

impl CacheStats {
    /// Hits over lookups, `0.0` before the first lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Cache summary for the health and metrics endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheInfo {
    pub mode: CacheMode,
    pub external_enabled: bool,
    pub hit_rate: f64,
    pub ttl_secs: u64,
    pub items: usize,
    pub stats: CacheStats,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    external_hits: u64,
    local_hits: u64,
}

#[derive(Clone, Copy)]
enum Tier {
    External,
    Local,
}

struct Sweeper {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Hybrid book cache.
pub struct HybridBookCache {
    external: Arc<dyn CacheInterface>,
    local: Arc<LocalCache>,
    settings: CacheSettings,
    use_external: bool,
    counters: Arc<RwLock<Counters>>,
    sweeper: Mutex<Option<Sweeper>>,
    closed: AtomicBool,
}

impl HybridBookCache {
    /// Creates the cache, probing the external tier once.
    pub async fn new(external: Arc<dyn CacheInterface>, settings: CacheSettings) -> Self {
        let use_external = if external.is_enabled() {
            match external.ping().await {
                Ok(()) => {
                    info!("External cache tier reachable, running in hybrid mode");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "External cache tier unavailable, running local-only");
                    false
                }
            }
        } else {
            info!("External cache tier disabled, running local-only");
            false
        };

        let local = Arc::new(LocalCache::new());
        let counters = Arc::new(RwLock::new(Counters::default()));
        let sweeper = (!use_external).then(|| {
            spawn_sweeper(
                Arc::clone(&local),
                Arc::clone(&counters),
                settings.cleanup_interval,
            )
        });

        Self {
            external,
            local,
            settings,
            use_external,
            counters,
            sweeper: Mutex::new(sweeper),
            closed: AtomicBool::new(false),
        }
    }

    /// A cache with no external tier.
    pub async fn local_only(settings: CacheSettings) -> Self {
        Self::new(Arc::new(RedisCacheService::disabled()), settings).await
    }

    pub async fn get_book(&self, id: BookId) -> Option<Book> {
        self.lookup(&cache_keys::book_key(id)).await
    }

    pub async fn set_book(&self, book: &Book) {
        let key = cache_keys::book_key(book.id);
        self.store(&key, book, self.settings.book_ttl).await;
    }

    pub async fn get_book_list(&self, filter: &BookFilter) -> Option<BooksListResponse> {
        self.lookup(&cache_keys::book_list_key(filter)).await
    }

    pub async fn set_book_list(&self, filter: &BookFilter, response: &BooksListResponse) {
        let key = cache_keys::book_list_key(filter);
        self.store(&key, response, self.settings.book_list_ttl).await;
    }

    /// Drops the book and every cached list page from both tiers.
    pub async fn invalidate_book(&self, id: BookId) {
        let key = cache_keys::book_key(id);

        if self.use_external {
            if let Err(e) = self.external.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to delete book from external cache");
            }
        }
        self.local.remove(&key);

        self.invalidate_book_lists().await;
        debug!(book_id = %id, "Invalidated book cache entries");
    }

    /// Drops every cached list page from both tiers.
    pub async fn invalidate_book_lists(&self) {
        if self.use_external {
            if let Err(e) = self.external.delete_pattern(BOOK_LIST_PATTERN).await {
                warn!(error = %e, "Failed to delete book lists from external cache");
            }
        }

        let removed = self.local.remove_prefix(BOOK_LIST_PREFIX);
        debug!(removed, "Invalidated cached book lists");
    }

    /// Empties the local tier now and flushes the book namespaces of the
    /// external tier in the background.
    pub fn clear(&self) {
        if self.use_external {
            let external = Arc::clone(&self.external);
            tokio::spawn(async move {
                for pattern in [BOOK_PATTERN, BOOK_LIST_PATTERN] {
                    if let Err(e) = external.delete_pattern(pattern).await {
                        warn!(pattern, error = %e, "Failed to flush external cache");
                    }
                }
            });
        }

        self.local.clear();
        debug!("Local cache cleared");
    }

    /// Local entries currently stored.
    #[must_use]
    pub fn size(&self) -> usize {
        self.local.len()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let counters = self.counters.read();
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            items: self.local.len(),
            evictions: counters.evictions,
            external_hits: counters.external_hits,
            local_hits: counters.local_hits,
        }
    }

    #[must_use]
    pub fn info(&self) -> CacheInfo {
        let stats = self.stats();
        CacheInfo {
            mode: if self.use_external {
                CacheMode::Hybrid
            } else {
                CacheMode::LocalOnly
            },
            external_enabled: self.use_external,
            hit_rate: stats.hit_rate(),
            ttl_secs: self.settings.ttl.as_secs(),
            items: stats.items,
            stats,
        }
    }

    #[must_use]
    pub const fn is_external_active(&self) -> bool {
        self.use_external
    }

    /// Stops the sweeper and closes the external tier. Later calls do nothing.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let sweeper = self.sweeper.lock().take();
        if let Some(Sweeper { cancel, handle }) = sweeper {
            let _ = cancel.send(true);
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache sweeper ended abnormally");
            }
        }

        if self.use_external {
            self.external.close().await;
        }
        info!("Cache shut down");
    }

    async fn lookup<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        if self.use_external {
            match self.external.get::<T>(key).await {
                Ok(Some(value)) => {
                    self.record_hit(Tier::External);
                    debug!(key, "External cache hit");
                    return Some(value);
                }
                Ok(None) => {}
                Err(e) => warn!(key, error = %e, "External cache read failed, trying local tier"),
            }
        }

        match self.local.get(key) {
            LocalLookup::Hit(payload) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    self.record_hit(Tier::Local);
                    debug!(key, "Local cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "Dropping undecodable local cache entry");
                    self.local.remove(key);
                    self.record_miss();
                    None
                }
            },
            LocalLookup::Expired => {
                let local = Arc::clone(&self.local);
                let key = key.to_string();
                tokio::spawn(async move {
                    local.remove_if_expired(&key);
                });
                self.record_miss();
                None
            }
            LocalLookup::Missing => {
                self.record_miss();
                debug!(key, "Cache miss");
                None
            }
        }
    }

    async fn store<T: Serialize + Sync>(&self, key: &str, value: &T, external_ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if self.use_external {
            if let Err(e) = self.external.set_raw(key, &payload, external_ttl).await {
                warn!(key, error = %e, "Failed to write external cache");
            }
        }

        self.local.insert(key, payload, self.settings.ttl);
    }

    fn record_hit(&self, tier: Tier) {
        let mut counters = self.counters.write();
        counters.hits += 1;
        match tier {
            Tier::External => counters.external_hits += 1,
            Tier::Local => counters.local_hits += 1,
        }
    }

    fn record_miss(&self) {
        self.counters.write().misses += 1;
    }
}

fn spawn_sweeper(
    local: Arc<LocalCache>,
    counters: Arc<RwLock<Counters>>,
    period: Duration,
) -> Sweeper {
    let period = period.max(MIN_SWEEP_INTERVAL);
    let (cancel, mut cancelled) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        debug!(period_ms = period.as_millis(), "Cache sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = local.purge_expired();
                    if evicted > 0 {
                        counters.write().evictions += evicted as u64;
                        debug!(evicted, "Evicted expired cache entries");
                    }
                }
                changed = cancelled.changed() => {
                    if changed.is_err() || *cancelled.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Cache sweeper stopped");
    });

    Sweeper { cancel, handle }
}
