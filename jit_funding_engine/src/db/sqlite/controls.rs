use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::SpendingControl};

pub async fn fetch_control(
    card_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<SpendingControl>, SqliteDatabaseError> {
    let control = sqlx::query_as(
        "SELECT card_id, daily_limit, monthly_limit, merchant_restrictions FROM spending_controls WHERE card_id = $1",
    )
    .bind(card_id)
    .fetch_optional(conn)
    .await?;
    Ok(control)
}
