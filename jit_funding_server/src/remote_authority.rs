//! An HTTP client for a peer JIT funding server.
//!
//! A server configured with `JIT_REMOTE_AUTHORITY_URL` delegates each decision to the peer's `POST /api/authorize`
//! endpoint. The engine's [`FallbackAuthorizer`](jit_funding_engine::FallbackAuthorizer) bounds the call with a timeout
//! and decides locally if the peer fails.
use std::time::Duration;

use jit_common::Secret;
use jit_funding_engine::{AuthorizationRequest, Decision, RemoteAuthority, RemoteAuthorityError};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use crate::middleware::ADMIN_KEY_HEADER;

#[derive(Clone)]
pub struct HttpAuthority {
    client: Client,
    endpoint: String,
    admin_key: Secret<String>,
}

impl HttpAuthority {
    pub fn new(base_url: &str, admin_key: Secret<String>, timeout: Duration) -> Result<Self, RemoteAuthorityError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("JIT Funding Server")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteAuthorityError::Transport(e.to_string()))?;
        let endpoint = format!("{}/api/authorize", base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint, admin_key })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteAuthority for HttpAuthority {
    fn name(&self) -> &str {
        &self.endpoint
    }

    async fn decide(&self, request: &AuthorizationRequest) -> Result<Decision, RemoteAuthorityError> {
        trace!("⚖️ Delegating authorization for card {} to {}", request.card_id, self.endpoint);
        let res = self
            .client
            .post(&self.endpoint)
            .header(ADMIN_KEY_HEADER, self.admin_key.reveal())
            .json(request)
            .send()
            .await
            .map_err(|e| RemoteAuthorityError::Transport(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let reason = res.text().await.unwrap_or_default();
            return Err(RemoteAuthorityError::InvalidResponse(format!("{status}: {reason}")));
        }
        res.json::<Decision>().await.map_err(|e| RemoteAuthorityError::InvalidResponse(e.to_string()))
    }
}
