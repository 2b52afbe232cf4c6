use std::time::Duration;

use log::*;

use crate::jit_api::{
    authorization_objects::{AuthorizationRequest, Decision},
    errors::RemoteAuthorityError,
    new_event_token,
};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Anything that can make a funding decision. The contract is that of
/// [`JitFundingApi::authorize`](crate::JitFundingApi::authorize): it always returns a decision.
#[allow(async_fn_in_trait)]
pub trait Authorizer {
    async fn authorize(&self, request: AuthorizationRequest) -> Decision;
}

/// A decision service in another process, such as a peer engine exposing `POST /api/authorize`.
#[allow(async_fn_in_trait)]
pub trait RemoteAuthority {
    fn name(&self) -> &str;

    async fn decide(&self, request: &AuthorizationRequest) -> Result<Decision, RemoteAuthorityError>;
}

/// Delegates decisions to a remote authority, falling back to a local authorizer when the remote is not configured,
/// fails, or takes longer than the timeout.
///
/// The local authorizer applies the same rules, so the only observable difference between the two paths is latency.
pub struct FallbackAuthorizer<R, L> {
    remote: Option<R>,
    local: L,
    timeout: Duration,
}

impl<R, L> FallbackAuthorizer<R, L> {
    pub fn new(remote: Option<R>, local: L) -> Self {
        Self { remote, local, timeout: DEFAULT_REMOTE_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

impl<R: Clone, L: Clone> Clone for FallbackAuthorizer<R, L> {
    fn clone(&self) -> Self {
        Self { remote: self.remote.clone(), local: self.local.clone(), timeout: self.timeout }
    }
}

impl<R, L> Authorizer for FallbackAuthorizer<R, L>
where
    R: RemoteAuthority,
    L: Authorizer,
{
    async fn authorize(&self, mut request: AuthorizationRequest) -> Decision {
        let Some(remote) = &self.remote else {
            return self.local.authorize(request).await;
        };
        // Both paths must trace the attempt under the same token
        if request.event_token.is_none() {
            request.event_token = Some(new_event_token());
        }
        let outcome = match tokio::time::timeout(self.timeout, remote.decide(&request)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteAuthorityError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))),
        };
        match outcome {
            Ok(decision) => {
                trace!("⚖️ {} decided {} remotely", remote.name(), decision.reason);
                decision
            },
            Err(e) => {
                warn!("⚖️ Remote authority {} failed. Deciding locally. {e}", remote.name());
                self.local.authorize(request).await
            },
        }
    }
}
