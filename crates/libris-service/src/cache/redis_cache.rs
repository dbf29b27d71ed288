//! Redis-based external cache tier.

use super::CacheInterface;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, RedisResult};
use deadpool_redis::{Config, Pool, Runtime};
use libris_config::RedisConfig;
use libris_core::{LibrisError, LibrisResult};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Keys fetched per SCAN round.
const SCAN_BATCH: usize = 100;

/// Create a Redis connection pool.
///
/// Connections are opened lazily, so an unreachable server is only noticed
/// on first use.
pub fn create_redis_pool(config: &RedisConfig) -> LibrisResult<Pool> {
    info!(url = %config.url, pool_size = config.pool_size, "Creating Redis connection pool");

    Config::from_url(&config.url)
        .builder()
        .map_err(|e| LibrisError::Configuration(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| LibrisError::Configuration(format!("Failed to create Redis pool: {e}")))
}

/// Redis-based cache service.
///
/// Every command is bounded by `command_timeout`; a slow or unreachable
/// server surfaces as `LibrisError::Cache` instead of a hang.
pub struct RedisCacheService {
    /// Redis connection pool. `None` when caching is disabled.
    pool: Option<Arc<Pool>>,
    command_timeout: Duration,
}

impl RedisCacheService {
    /// Create a new Redis cache service.
    #[must_use]
    pub fn new(pool: Arc<Pool>, command_timeout: Duration) -> Self {
        Self {
            pool: Some(pool),
            command_timeout,
        }
    }

    /// Build from configuration; returns the disabled service when
    /// `redis.enabled` is false.
    pub fn from_config(config: &RedisConfig) -> LibrisResult<Self> {
        if !config.enabled {
            info!("Redis disabled by configuration");
            return Ok(Self::disabled());
        }
        let pool = create_redis_pool(config)?;
        Ok(Self::new(Arc::new(pool), config.command_timeout()))
    }

    /// Create a no-op cache service (for when Redis is disabled).
    ///
    /// Reads miss, writes succeed and `ping` fails.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            pool: None,
            command_timeout: Duration::ZERO,
        }
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> LibrisResult<deadpool_redis::Connection> {
        let Some(pool) = &self.pool else {
            return Err(LibrisError::Cache("Cache is disabled".to_string()));
        };

        match tokio::time::timeout(self.command_timeout, pool.get()).await {
            Ok(conn) => conn.map_err(|e| LibrisError::Cache(format!("Failed to get Redis connection: {e}"))),
            Err(_) => Err(LibrisError::Cache(format!(
                "Redis connection timed out after {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }

    /// Runs one command under the command timeout.
    async fn run<T, F>(&self, op: &str, target: &str, command: F) -> LibrisResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(LibrisError::Cache(format!("Failed to {op} '{target}': {e}"))),
            Err(_) => Err(LibrisError::Cache(format!(
                "{op} '{target}' timed out after {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl CacheInterface for RedisCacheService {
    fn is_enabled(&self) -> bool {
        self.pool.is_some()
    }

    async fn get_raw(&self, key: &str) -> LibrisResult<Option<String>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let mut conn = self.get_conn().await?;
        let value: Option<String> = self.run("get", key, conn.get(key)).await?;

        match &value {
            Some(_) => debug!(key, "Redis hit"),
            None => debug!(key, "Redis miss"),
        }

        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> LibrisResult<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut conn = self.get_conn().await?;
        let ttl_secs = ttl.as_secs().max(1);

        self.run("set", key, conn.set_ex::<_, _, ()>(key, value, ttl_secs))
            .await?;

        debug!(key, ttl_secs, "Cached key in Redis");
        Ok(())
    }

    async fn delete(&self, key: &str) -> LibrisResult<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }

        let mut conn = self.get_conn().await?;
        let deleted: i64 = self.run("delete", key, conn.del(key)).await?;

        debug!(key, deleted = deleted > 0, "Deleted key from Redis");
        Ok(deleted > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> LibrisResult<u64> {
        if !self.is_enabled() {
            return Ok(0);
        }

        let mut conn = self.get_conn().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = self
                .run(
                    "scan",
                    pattern,
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut *conn),
                )
                .await?;

            if !keys.is_empty() {
                let removed: u64 = self.run("delete keys matching", pattern, conn.del(&keys)).await?;
                deleted += removed;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern, deleted, "Deleted keys matching pattern");
        Ok(deleted)
    }

    async fn ping(&self) -> LibrisResult<()> {
        let mut conn = self.get_conn().await?;
        let _: String = self
            .run("ping", "server", redis::cmd("PING").query_async(&mut *conn))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close();
            info!("Redis connection pool closed");
        }
    }
}
