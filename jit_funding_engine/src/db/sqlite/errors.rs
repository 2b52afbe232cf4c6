use thiserror::Error;

use crate::db::traits::StoreError;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Stored value could not be decoded: {0}")]
    DecodeError(String),
}

impl From<SqliteDatabaseError> for StoreError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DecodeError(s) => StoreError::DecodeError(s),
            SqliteDatabaseError::DriverError(sqlx::Error::Database(e)) => StoreError::WriteRejected(e.to_string()),
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}
