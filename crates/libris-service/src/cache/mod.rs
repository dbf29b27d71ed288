//! Caching infrastructure for the service layer.
//!
//! [`HybridBookCache`] puts an external tier (Redis, or the disabled no-op)
//! in front of an in-process [`LocalCache`].

mod cache_interface;
pub mod cache_keys;
mod hybrid_cache;
mod local_cache;
mod redis_cache;

#[cfg(test)]
pub use cache_interface::MockCacheInterface;
pub use cache_interface::{CacheExt, CacheInterface};
pub use hybrid_cache::{CacheInfo, CacheMode, CacheSettings, CacheStats, HybridBookCache};
pub use local_cache::{LocalCache, LocalLookup};
pub use redis_cache::{create_redis_pool, RedisCacheService};
