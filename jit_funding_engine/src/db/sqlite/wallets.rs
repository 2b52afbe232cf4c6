use jit_common::Amount;
use sqlx::SqliteConnection;

use crate::db::sqlite::SqliteDatabaseError;

pub async fn fetch_balance(
    user_id: &str,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Amount>, SqliteDatabaseError> {
    let balance = sqlx::query_scalar("SELECT balance FROM wallet_balances WHERE user_id = $1 AND currency = $2")
        .bind(user_id)
        .bind(currency)
        .fetch_optional(conn)
        .await?;
    Ok(balance)
}
