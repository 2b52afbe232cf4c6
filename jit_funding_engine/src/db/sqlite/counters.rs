use jit_common::Amount;
use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::SpendingTotals};

/// Adds `amount` to the card's counter for `day` in a single upsert statement, and returns the new total.
///
/// With a `ceiling`, the upsert only writes if the new total stays within it. Otherwise no row is touched and `None` is
/// returned.
///
/// Both statements are run to completion with `fetch_all` so that the write is committed before this returns.
pub async fn increment(
    card_id: &str,
    day: &str,
    amount: Amount,
    ceiling: Option<Amount>,
    conn: &mut SqliteConnection,
) -> Result<Option<Amount>, SqliteDatabaseError> {
    let totals: Vec<Amount> = match ceiling {
        None => {
            sqlx::query_scalar(
                r#"
                INSERT INTO spending_counters (card_id, spend_date, amount) VALUES ($1, $2, $3)
                ON CONFLICT (card_id, spend_date) DO UPDATE
                    SET amount = amount + excluded.amount, updated_at = CURRENT_TIMESTAMP
                RETURNING amount
                "#,
            )
            .bind(card_id)
            .bind(day)
            .bind(amount)
            .fetch_all(conn)
            .await?
        },
        Some(limit) => {
            // The WHERE on the SELECT also keeps SQLite from parsing ON CONFLICT as a join constraint
            sqlx::query_scalar(
                r#"
                INSERT INTO spending_counters (card_id, spend_date, amount)
                    SELECT $1, $2, $3 WHERE $3 <= $4
                ON CONFLICT (card_id, spend_date) DO UPDATE
                    SET amount = amount + excluded.amount, updated_at = CURRENT_TIMESTAMP
                    WHERE spending_counters.amount + excluded.amount <= $4
                RETURNING amount
                "#,
            )
            .bind(card_id)
            .bind(day)
            .bind(amount)
            .bind(limit)
            .fetch_all(conn)
            .await?
        },
    };
    Ok(totals.into_iter().next())
}

pub async fn totals(
    card_id: &str,
    day: &str,
    month: &str,
    conn: &mut SqliteConnection,
) -> Result<SpendingTotals, SqliteDatabaseError> {
    let totals = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN spend_date = $2 THEN amount ELSE 0 END), 0) AS daily,
            COALESCE(SUM(amount), 0) AS monthly
        FROM spending_counters
        WHERE card_id = $1 AND substr(spend_date, 1, 7) = $3
        "#,
    )
    .bind(card_id)
    .bind(day)
    .bind(month)
    .fetch_one(conn)
    .await?;
    Ok(totals)
}

pub async fn fetch_counter(
    card_id: &str,
    day: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Amount>, SqliteDatabaseError> {
    let amount = sqlx::query_scalar("SELECT amount FROM spending_counters WHERE card_id = $1 AND spend_date = $2")
        .bind(card_id)
        .bind(day)
        .fetch_optional(conn)
        .await?;
    Ok(amount)
}
