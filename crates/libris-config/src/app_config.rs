//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// External cache tier (Redis) configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Hybrid cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background worker pool configuration.
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Request handler limits and deadlines.
    #[serde(default)]
    pub handler: HandlerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "libris".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Enable CORS.
    pub cors_enabled: bool,
    /// CORS allowed origins.
    pub cors_origins: Vec<String>,
    /// Upper bound for the whole shutdown sequence, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Returns the listen address.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the shutdown timeout as a Duration.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL. `memory://` selects the in-process store.
    pub url: String,
    /// Minimum connection pool size.
    pub min_connections: u32,
    /// Maximum connection pool size.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds.
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost:5432/libmngmt".to_string(),
            min_connections: 2,
            max_connections: 20,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl DatabaseConfig {
    /// URL scheme that selects the in-memory repository.
    pub const MEMORY_URL: &'static str = "memory://";

    /// True when the in-memory repository is selected.
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(Self::MEMORY_URL)
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the idle timeout as a Duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis URL.
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Enable Redis (the cache runs local-only when disabled).
    pub enabled: bool,
    /// Per-command timeout in milliseconds.
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            pool_size: 10,
            enabled: true,
            command_timeout_ms: 500,
        }
    }
}

impl RedisConfig {
    /// Returns the per-command timeout as a Duration.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Hybrid cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for local-tier entries, in seconds.
    pub ttl_secs: u64,
    /// Interval of the local expiry sweeper, in seconds.
    pub cleanup_interval_secs: u64,
    /// External-tier TTL for single books, in seconds.
    pub book_ttl_secs: u64,
    /// External-tier TTL for list pages, in seconds.
    pub book_list_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            cleanup_interval_secs: 60,
            book_ttl_secs: 600,
            book_list_ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    /// Returns the local TTL as a Duration.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Returns the sweeper interval as a Duration.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Returns the single-book TTL as a Duration.
    #[must_use]
    pub const fn book_ttl(&self) -> Duration {
        Duration::from_secs(self.book_ttl_secs)
    }

    /// Returns the list-page TTL as a Duration.
    #[must_use]
    pub const fn book_list_ttl(&self) -> Duration {
        Duration::from_secs(self.book_list_ttl_secs)
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Bounded job queue capacity.
    pub queue_capacity: usize,
    /// Result channel buffer.
    pub result_buffer: usize,
    /// Base simulated processing time per job, in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 100,
            result_buffer: 100,
            base_delay_ms: 50,
        }
    }
}

impl WorkerConfig {
    /// Returns the base processing delay as a Duration.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Request handler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Concurrency slots for create and bulk-create.
    pub slot_capacity: usize,
    /// Create deadline (parse and process), in seconds.
    pub create_timeout_secs: u64,
    /// Get-by-id deadline, in seconds.
    pub get_timeout_secs: u64,
    /// List deadline, in seconds.
    pub list_timeout_secs: u64,
    /// Bulk-create deadline, in seconds.
    pub bulk_timeout_secs: u64,
    /// Maximum items per bulk-create request.
    pub bulk_max_items: usize,
    /// Concurrent creates inside one bulk request.
    pub bulk_concurrency: usize,
    /// ISBN uniqueness check timeout, in seconds.
    pub uniqueness_timeout_secs: u64,
    /// Request body limit, in bytes.
    pub max_body_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            slot_capacity: 100,
            create_timeout_secs: 30,
            get_timeout_secs: 10,
            list_timeout_secs: 15,
            bulk_timeout_secs: 60,
            bulk_max_items: 100,
            bulk_concurrency: 10,
            uniqueness_timeout_secs: 5,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

impl HandlerConfig {
    /// Returns the create deadline as a Duration.
    #[must_use]
    pub const fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    /// Returns the get deadline as a Duration.
    #[must_use]
    pub const fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.get_timeout_secs)
    }

    /// Returns the list deadline as a Duration.
    #[must_use]
    pub const fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    /// Returns the bulk deadline as a Duration.
    #[must_use]
    pub const fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }

    /// Returns the uniqueness check timeout as a Duration.
    #[must_use]
    pub const fn uniqueness_timeout(&self) -> Duration {
        Duration::from_secs(self.uniqueness_timeout_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}
