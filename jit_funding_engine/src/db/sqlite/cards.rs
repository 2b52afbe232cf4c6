use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Card, CardStatus},
};

/// Fetches the card, with its spent counters for the given day and month buckets.
pub async fn fetch_card(
    card_id: &str,
    day: &str,
    month: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Card>, SqliteDatabaseError> {
    let card = sqlx::query_as(
        r#"
        SELECT
            c.id, c.user_id, c.status, c.daily_limit, c.monthly_limit,
            COALESCE((SELECT amount FROM spending_counters s WHERE s.card_id = c.id AND s.spend_date = $2), 0)
                AS daily_spent,
            COALESCE((SELECT SUM(amount) FROM spending_counters s
                      WHERE s.card_id = c.id AND substr(s.spend_date, 1, 7) = $3), 0) AS monthly_spent,
            c.created_at, c.updated_at
        FROM cards c WHERE c.id = $1
        "#,
    )
    .bind(card_id)
    .bind(day)
    .bind(month)
    .fetch_optional(conn)
    .await?;
    Ok(card)
}

pub async fn fetch_owner(card_id: &str, conn: &mut SqliteConnection) -> Result<Option<String>, SqliteDatabaseError> {
    let owner = sqlx::query_scalar("SELECT user_id FROM cards WHERE id = $1").bind(card_id).fetch_optional(conn).await?;
    Ok(owner)
}

/// Returns `true` if a card was updated.
pub async fn update_status(
    card_id: &str,
    status: CardStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE cards SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(status.to_string())
        .bind(card_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
