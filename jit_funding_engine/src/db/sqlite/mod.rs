pub mod db;
mod errors;

pub mod cards;
pub mod controls;
pub mod counters;
pub mod traces;
pub mod transactions;
pub mod users;
pub mod wallets;

use std::env;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

const SQLITE_DB_URL: &str = "sqlite://data/jit_store.db";

pub fn db_url() -> String {
    let result = env::var("JIT_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ JIT_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
