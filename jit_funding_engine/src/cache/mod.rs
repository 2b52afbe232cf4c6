//! # Cache layer
//!
//! A key-value cache fronting the durable store for card and user records. Values are JSON strings with a TTL.
//!
//! The cache is derived state and strictly best-effort. [`ReadThroughCache`] is the only way the engine talks to it:
//! any [`CacheError`] is logged and treated as a miss, and never reaches the authorization decision.
//!
//! Two stores are provided:
//! * [`MemoryCache`], a capacity-bounded in-process map with lazy expiry.
//! * `RedisCache` (behind the `redis` feature), for deployments where several engine instances share a cache.
//!
//! [`CacheBackend`] lets a server pick one of them at start-up.
mod memory;
mod read_through;
#[cfg(feature = "redis")]
mod redis_cache;

use std::time::Duration;

pub use memory::{MemoryCache, DEFAULT_CACHE_CAPACITY};
pub use read_through::{card_key, user_key, ReadThroughCache, DEFAULT_CARD_TTL, DEFAULT_USER_TTL};
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache is unavailable: {0}")]
    Unavailable(String),
    #[error("Cache lock was poisoned")]
    LockPoisoned,
    #[error("Cache command failed: {0}")]
    CommandFailed(String),
}

/// The contract every cache store fulfils. Implementations must not hold a lock across an await point.
#[allow(async_fn_in_trait)]
pub trait CacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub enum CacheBackend {
    Memory(MemoryCache),
    #[cfg(feature = "redis")]
    Redis(RedisCache),
}

impl CacheBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            #[cfg(feature = "redis")]
            Self::Redis(_) => "redis",
        }
    }
}

impl CacheStore for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            Self::Memory(c) => c.get(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(c) => c.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        match self {
            Self::Memory(c) => c.set(key, value, ttl).await,
            #[cfg(feature = "redis")]
            Self::Redis(c) => c.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            Self::Memory(c) => c.delete(key).await,
            #[cfg(feature = "redis")]
            Self::Redis(c) => c.delete(key).await,
        }
    }
}

impl From<MemoryCache> for CacheBackend {
    fn from(cache: MemoryCache) -> Self {
        Self::Memory(cache)
    }
}
