use cucumber::World;
use jit_funding_engine::{
    cache::{MemoryCache, ReadThroughCache},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    Decision,
    JitConfig,
    JitFundingApi,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct JitWorld {
    pub system: Option<AuthorizationSystem>,
    pub last_decision: Option<(String, Decision)>,
}

#[derive(Debug)]
pub struct AuthorizationSystem {
    pub db_path: String,
    pub api: JitFundingApi<SqliteDatabase, MemoryCache>,
}

impl JitWorld {
    pub fn api(&self) -> &JitFundingApi<SqliteDatabase, MemoryCache> {
        &self.system.as_ref().expect("JitFundingApi not initialised").api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }

    pub fn last_decision(&self) -> &(String, Decision) {
        self.last_decision.as_ref().expect("No authorization has been requested yet")
    }
}

impl AuthorizationSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let cache = ReadThroughCache::new(MemoryCache::new(100));
        let api = JitFundingApi::new(db, cache, JitConfig::default(), EventProducers::default());
        Self { db_path: url, api }
    }
}
