//! Contract of the external cache tier.

use async_trait::async_trait;
use libris_core::LibrisResult;
use std::time::Duration;

/// External cache tier for storing and retrieving cached data.
///
/// Values travel as JSON strings so the trait stays dyn-compatible; use
/// [`CacheExt`] for typed access. Implementations report failures as
/// `LibrisError::Cache` and leave it to the caller whether to care.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheInterface: Send + Sync {
    /// Get a raw JSON value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get_raw(&self, key: &str) -> LibrisResult<Option<String>>;

    /// Set a raw JSON value in the cache with a TTL.
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> LibrisResult<()>;

    /// Delete a value from the cache.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> LibrisResult<bool>;

    /// Delete every key matching a glob pattern.
    ///
    /// Returns the number of keys deleted.
    async fn delete_pattern(&self, pattern: &str) -> LibrisResult<u64>;

    /// Liveness probe.
    async fn ping(&self) -> LibrisResult<()>;

    /// Release the underlying connections.
    async fn close(&self);

    /// Check if caching is enabled.
    fn is_enabled(&self) -> bool;
}

/// Typed reads over [`CacheInterface`].
#[async_trait]
pub trait CacheExt: CacheInterface {
    /// Get a typed value from the cache.
    async fn get<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> LibrisResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(json) => {
                let value: T = serde_json::from_str(&json)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

impl<T: CacheInterface + ?Sized> CacheExt for T {}
