use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A stored record could not be decoded: {0}")]
    DecodeError(String),
    #[error("The store rejected the write: {0}")]
    WriteRejected(String),
}
