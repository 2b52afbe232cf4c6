use std::time::Duration;

use log::*;
use redis::{aio::MultiplexedConnection, Client};

use crate::cache::{CacheError, CacheStore};

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
            CacheError::Unavailable(e.to_string())
        } else {
            CacheError::CommandFailed(e.to_string())
        }
    }
}

/// A cache held in Redis, shared by every engine instance pointing at the same server.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        info!("🧊️ Connected to Redis cache");
        Ok(Self { conn })
    }
}

impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value = redis::cmd("GET").arg(key).query_async::<_, Option<String>>(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        redis::cmd("SET").arg(key).arg(value).arg("EX").arg(secs).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
