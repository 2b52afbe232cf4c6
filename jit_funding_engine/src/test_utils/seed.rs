//! Fixtures for populating a test store. Account provisioning is outside the engine, so these write the tables
//! directly.
use jit_common::Amount;

use crate::{
    db_types::{AccountType, CardStatus, MerchantRestrictions},
    SqliteDatabase,
};

pub async fn user(db: &SqliteDatabase, id: &str, account_type: AccountType) {
    let kind = match account_type {
        AccountType::Personal => "personal",
        AccountType::Business => "business",
    };
    sqlx::query("INSERT INTO users (id, account_type) VALUES ($1, $2)")
        .bind(id)
        .bind(kind)
        .execute(db.pool())
        .await
        .expect("Error inserting user");
}

pub async fn card(
    db: &SqliteDatabase,
    id: &str,
    user_id: &str,
    status: CardStatus,
    daily_limit: Option<Amount>,
    monthly_limit: Option<Amount>,
) {
    sqlx::query("INSERT INTO cards (id, user_id, status, daily_limit, monthly_limit) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(user_id)
        .bind(status.to_string())
        .bind(daily_limit)
        .bind(monthly_limit)
        .execute(db.pool())
        .await
        .expect("Error inserting card");
}

pub async fn control(
    db: &SqliteDatabase,
    card_id: &str,
    daily_limit: Option<Amount>,
    monthly_limit: Option<Amount>,
    restrictions: Option<&MerchantRestrictions>,
) {
    let restrictions = restrictions.map(|r| serde_json::to_string(r).expect("Error serializing restrictions"));
    sqlx::query(
        "INSERT INTO spending_controls (card_id, daily_limit, monthly_limit, merchant_restrictions) VALUES ($1, $2, \
         $3, $4)",
    )
    .bind(card_id)
    .bind(daily_limit)
    .bind(monthly_limit)
    .bind(restrictions)
    .execute(db.pool())
    .await
    .expect("Error inserting spending control");
}

/// Stores raw restriction text, e.g. to simulate a corrupt record.
pub async fn raw_restrictions(db: &SqliteDatabase, card_id: &str, raw: &str) {
    sqlx::query("INSERT INTO spending_controls (card_id, merchant_restrictions) VALUES ($1, $2)")
        .bind(card_id)
        .bind(raw)
        .execute(db.pool())
        .await
        .expect("Error inserting spending control");
}

pub async fn wallet(db: &SqliteDatabase, user_id: &str, currency: &str, balance: Amount) {
    sqlx::query("INSERT INTO wallet_balances (user_id, currency, balance) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(currency)
        .bind(balance)
        .execute(db.pool())
        .await
        .expect("Error inserting wallet balance");
}

/// Sets the card's spend for a day bucket, as if earlier approvals had been recorded.
pub async fn prior_spend(db: &SqliteDatabase, card_id: &str, day: &str, amount: Amount) {
    sqlx::query("INSERT INTO spending_counters (card_id, spend_date, amount) VALUES ($1, $2, $3)")
        .bind(card_id)
        .bind(day)
        .bind(amount)
        .execute(db.pool())
        .await
        .expect("Error inserting spending counter");
}
