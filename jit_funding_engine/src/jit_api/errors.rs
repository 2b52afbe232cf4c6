use thiserror::Error;

use crate::db::traits::StoreError;

/// Failures inside the authorization pipeline. These never leave the orchestrator: they become `SYSTEM_ERROR`
/// decisions.
#[derive(Debug, Clone, Error)]
pub enum JitError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Error)]
pub enum NetworkEventError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Invalid network event: {0}")]
    InvalidEvent(String),
}

#[derive(Debug, Clone, Error)]
pub enum RemoteAuthorityError {
    #[error("The remote authority did not answer within {0}ms")]
    Timeout(u64),
    #[error("Could not reach the remote authority: {0}")]
    Transport(String),
    #[error("The remote authority returned an unusable response: {0}")]
    InvalidResponse(String),
}
