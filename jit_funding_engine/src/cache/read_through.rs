use std::time::Duration;

use log::*;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    cache::CacheStore,
    db::traits::{AuthorizationDatabase, StoreError},
    db_types::{Card, User},
};

pub const DEFAULT_CARD_TTL: Duration = Duration::from_secs(900);
pub const DEFAULT_USER_TTL: Duration = Duration::from_secs(3600);

pub fn card_key(card_id: &str) -> String {
    format!("card:{card_id}")
}

pub fn user_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Read-through access to card and user records.
///
/// On a miss the record is read from the store and written back to the cache. Absent records are not cached. Cache
/// failures are logged and fall through to the store; store failures are returned to the caller.
#[derive(Clone)]
pub struct ReadThroughCache<C> {
    store: C,
    card_ttl: Duration,
    user_ttl: Duration,
}

impl<C> ReadThroughCache<C> {
    pub fn new(store: C) -> Self {
        Self { store, card_ttl: DEFAULT_CARD_TTL, user_ttl: DEFAULT_USER_TTL }
    }

    pub fn with_ttls(mut self, card_ttl: Duration, user_ttl: Duration) -> Self {
        self.card_ttl = card_ttl;
        self.user_ttl = user_ttl;
        self
    }

    pub fn store(&self) -> &C {
        &self.store
    }
}

impl<C: CacheStore> ReadThroughCache<C> {
    pub async fn card<B: AuthorizationDatabase>(&self, db: &B, card_id: &str) -> Result<Option<Card>, StoreError> {
        let key = card_key(card_id);
        if let Some(card) = self.cached::<Card>(&key).await {
            return Ok(Some(card));
        }
        let card = db.fetch_card(card_id).await?;
        if let Some(card) = &card {
            self.populate(&key, card, self.card_ttl).await;
        }
        Ok(card)
    }

    pub async fn user<B: AuthorizationDatabase>(&self, db: &B, user_id: &str) -> Result<Option<User>, StoreError> {
        let key = user_key(user_id);
        if let Some(user) = self.cached::<User>(&key).await {
            return Ok(Some(user));
        }
        let user = db.fetch_user(user_id).await?;
        if let Some(user) = &user {
            self.populate(&key, user, self.user_ttl).await;
        }
        Ok(user)
    }

    pub async fn invalidate_card(&self, card_id: &str) {
        self.invalidate(&card_key(card_id)).await;
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(v) => {
                    trace!("🧊️ Cache hit for {key}");
                    Some(v)
                },
                Err(e) => {
                    warn!("🧊️ Cached value for {key} could not be decoded. Treating it as a miss. {e}");
                    None
                },
            },
            Ok(None) => {
                trace!("🧊️ Cache miss for {key}");
                None
            },
            Err(e) => {
                warn!("🧊️ Cache read for {key} failed. Falling back to the store. {e}");
                None
            },
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                warn!("🧊️ Could not serialize {key} for caching. {e}");
                return;
            },
        };
        if let Err(e) = self.store.set(key, json, ttl).await {
            warn!("🧊️ Could not cache {key}. {e}");
        }
    }

    async fn invalidate(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(()) => trace!("🧊️ Invalidated {key}"),
            Err(e) => warn!("🧊️ Could not invalidate {key}. It will expire with its TTL. {e}"),
        }
    }
}
