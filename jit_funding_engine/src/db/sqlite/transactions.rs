use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db::{sqlite::SqliteDatabaseError, traits::InsertTransactionResult},
    db_types::{NewTransaction, Transaction},
};

pub async fn idempotent_insert(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<InsertTransactionResult, SqliteDatabaseError> {
    let created_at = tx.created_at.unwrap_or_else(Utc::now);
    // Run to completion so the row is committed before this returns
    let inserted: Result<Vec<i64>, sqlx::Error> = sqlx::query_scalar(
        r#"
        INSERT INTO transactions
            (token, card_id, user_id, amount, currency, merchant_name, merchant_category, status, transaction_type,
             created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(&tx.token)
    .bind(&tx.card_id)
    .bind(&tx.user_id)
    .bind(tx.amount)
    .bind(&tx.currency)
    .bind(&tx.merchant_name)
    .bind(&tx.merchant_category)
    .bind(&tx.status)
    .bind(&tx.transaction_type)
    .bind(created_at)
    .fetch_all(&mut *conn)
    .await;
    match inserted {
        Ok(ids) => ids
            .into_iter()
            .next()
            .map(InsertTransactionResult::Inserted)
            .ok_or_else(|| SqliteDatabaseError::QueryError(format!("Inserting transaction {} returned no id", tx.token))),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let id = sqlx::query_scalar("SELECT id FROM transactions WHERE token = $1")
                .bind(&tx.token)
                .fetch_one(conn)
                .await?;
            Ok(InsertTransactionResult::AlreadyExists(id))
        },
        Err(e) => Err(SqliteDatabaseError::from(e)),
    }
}

pub async fn fetch_transaction(
    token: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, SqliteDatabaseError> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE token = $1").bind(token).fetch_optional(conn).await?;
    Ok(tx)
}
