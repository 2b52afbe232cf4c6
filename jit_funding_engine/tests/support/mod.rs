#![allow(dead_code)]
use jit_common::Amount;
use jit_funding_engine::{
    cache::{MemoryCache, ReadThroughCache},
    events::EventProducers,
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    JitConfig,
    JitFundingApi,
    SqliteDatabase,
};
use log::*;

pub type TestApi = JitFundingApi<SqliteDatabase, MemoryCache>;

pub async fn setup_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn setup(config: JitConfig, producers: EventProducers) -> TestApi {
    let db = setup_db().await;
    JitFundingApi::new(db, ReadThroughCache::new(MemoryCache::new(100)), config, producers)
}

pub async fn tear_down(db: &SqliteDatabase) {
    let url = jit_funding_engine::AuthorizationDatabase::url(db).to_string();
    db.close().await;
    debug!("🚀️ Removing test database {url}");
    drop_database(&url).await;
}

pub fn usd(s: &str) -> Amount {
    s.parse().expect("Not a valid amount")
}
