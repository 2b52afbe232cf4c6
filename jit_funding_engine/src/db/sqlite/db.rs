use std::fmt::Debug;

use chrono::Utc;
use jit_common::Amount;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{cards, controls, counters, db_url, new_pool, traces, transactions, users, wallets, SqliteDatabaseError};
use crate::{
    db::traits::{
        day_bucket,
        month_bucket,
        AuthorizationDatabase,
        InsertTransactionResult,
        NetworkEventManagement,
        StoreError,
        TraceManagement,
    },
    db_types::{
        Card,
        CardStatus,
        ExecutionTrace,
        NewExecutionTrace,
        NewTransaction,
        SpendingControl,
        SpendingTotals,
        Transaction,
        User,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl AuthorizationDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_card(&self, card_id: &str) -> Result<Option<Card>, StoreError> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let card = cards::fetch_card(card_id, &day_bucket(now), &month_bucket(now), &mut conn).await?;
        trace!("🗃️ Card {card_id} fetched: {}", card.is_some());
        Ok(card)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(users::fetch_user(user_id, &mut conn).await?)
    }

    async fn fetch_spending_control(&self, card_id: &str) -> Result<Option<SpendingControl>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(controls::fetch_control(card_id, &mut conn).await?)
    }

    async fn fetch_spending_totals(&self, card_id: &str, day: &str, month: &str) -> Result<SpendingTotals, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(counters::totals(card_id, day, month, &mut conn).await?)
    }

    async fn fetch_wallet_balance(&self, user_id: &str, currency: &str) -> Result<Option<Amount>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(wallets::fetch_balance(user_id, currency, &mut conn).await?)
    }

    async fn increment_spending_counter(
        &self,
        card_id: &str,
        day: &str,
        amount: Amount,
        ceiling: Option<Amount>,
    ) -> Result<Option<Amount>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let total = counters::increment(card_id, day, amount, ceiling, &mut conn).await?;
        match total {
            Some(t) => debug!("🗃️ Spending counter for card {card_id} on {day} is now {t}"),
            None => debug!("🗃️ Spending counter for card {card_id} on {day} would exceed its ceiling. Not updated."),
        }
        Ok(total)
    }
}

impl TraceManagement for SqliteDatabase {
    async fn insert_trace(&self, trace: NewExecutionTrace) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let token = trace.event_token.clone();
        let id = traces::insert_trace(trace, &mut conn).await?;
        trace!("🗃️ Execution trace #{id} saved for event {token}");
        Ok(id)
    }

    async fn fetch_latest_trace(&self, event_token: &str) -> Result<Option<ExecutionTrace>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(traces::fetch_latest_for_event(event_token, &mut conn).await?)
    }

    async fn fetch_traces_for_event(&self, event_token: &str) -> Result<Vec<ExecutionTrace>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(traces::fetch_for_event(event_token, &mut conn).await?)
    }

    async fn fetch_traces_for_card(&self, card_id: &str, limit: u32) -> Result<Vec<ExecutionTrace>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(traces::fetch_for_card(card_id, limit, &mut conn).await?)
    }
}

impl NetworkEventManagement for SqliteDatabase {
    async fn fetch_card_owner(&self, card_id: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(cards::fetch_owner(card_id, &mut conn).await?)
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertTransactionResult, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let token = tx.token.clone();
        let result = transactions::idempotent_insert(tx, &mut conn).await?;
        match result {
            InsertTransactionResult::Inserted(id) => debug!("🗃️ Transaction {token} saved with id {id}"),
            InsertTransactionResult::AlreadyExists(id) => {
                debug!("🗃️ Transaction {token} already exists with id {id}. Nothing was changed.")
            },
        }
        Ok(result)
    }

    async fn fetch_transaction(&self, token: &str) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(transactions::fetch_transaction(token, &mut conn).await?)
    }

    async fn update_card_status(&self, card_id: &str, status: CardStatus) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let updated = cards::update_status(card_id, status, &mut conn).await?;
        if updated {
            info!("🗃️ Card {card_id} status set to {status}");
        }
        Ok(updated)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `JIT_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The raw spending counter for a card and day bucket. `None` if nothing has been spent.
    pub async fn fetch_spending_counter(&self, card_id: &str, day: &str) -> Result<Option<Amount>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        counters::fetch_counter(card_id, day, &mut conn).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
