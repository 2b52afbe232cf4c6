use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use log::*;

use crate::cache::{CacheError, CacheStore};

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// A bounded in-process cache.
///
/// There is no sweep timer. Expired entries are dropped when they are read, and when the cache is full, expired
/// entries are evicted first, followed by the entry closest to expiry. Clones share the same storage.
#[derive(Clone)]
pub struct MemoryCache {
    capacity: usize,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: Arc::new(Mutex::new(HashMap::with_capacity(capacity.min(1024)))) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of entries held, including expired entries that haven't been dropped yet.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_one(entries: &mut HashMap<String, Entry>, now: Instant) {
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        if entries.len() < before {
            trace!("🧊️ Evicted {} expired cache entries", before - entries.len());
            return;
        }
        let oldest = entries.iter().min_by_key(|(_, e)| e.expires_at).map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            trace!("🧊️ Cache is full. Evicting {key}");
            entries.remove(&key);
        }
    }
}

impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        let now = Instant::now();
        match entries.get(key) {
            Some(e) if e.expires_at > now => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        let now = Instant::now();
        if !entries.contains_key(key) && entries.len() >= self.capacity {
            Self::evict_one(&mut entries, now);
        }
        entries.insert(key.to_string(), Entry { value, expires_at: now + ttl });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}
