use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::User};

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, SqliteDatabaseError> {
    let user = sqlx::query_as("SELECT id, status, account_type, created_at, updated_at FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
