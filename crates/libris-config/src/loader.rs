//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use libris_core::LibrisError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `LIBRIS__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, LibrisError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, LibrisError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), LibrisError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, LibrisError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("LIBRIS_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        // LIBRIS__DATABASE__URL -> database.url
        builder = builder.add_source(
            Environment::with_prefix("LIBRIS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_libris_error)?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(config_error_to_libris_error)?;

        validate_config(&app_config)?;

        Ok(app_config)
    }

    /// Gets a specific configuration value by key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

/// Rejects configurations the server cannot start with.
pub fn validate_config(config: &AppConfig) -> Result<(), LibrisError> {
    if config.database.url.is_empty() {
        return Err(LibrisError::Configuration("Database URL is required".to_string()));
    }

    if config.workers.workers == 0 {
        return Err(LibrisError::Configuration(
            "workers.workers must be at least 1".to_string(),
        ));
    }

    if config.workers.queue_capacity == 0 {
        return Err(LibrisError::Configuration(
            "workers.queue_capacity must be at least 1".to_string(),
        ));
    }

    if config.handler.slot_capacity == 0 {
        return Err(LibrisError::Configuration(
            "handler.slot_capacity must be at least 1".to_string(),
        ));
    }

    if config.handler.bulk_max_items == 0 || config.handler.bulk_concurrency == 0 {
        return Err(LibrisError::Configuration(
            "handler bulk limits must be at least 1".to_string(),
        ));
    }

    if config.cache.cleanup_interval_secs == 0 {
        return Err(LibrisError::Configuration(
            "cache.cleanup_interval_secs must be at least 1".to_string(),
        ));
    }

    if config.app.environment == "production" && config.database.is_memory() {
        warn!("Using the in-memory repository in production; data will not survive restarts");
    }

    Ok(())
}

fn config_error_to_libris_error(err: ConfigError) -> LibrisError {
    LibrisError::Configuration(err.to_string())
}
