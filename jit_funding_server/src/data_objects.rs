use std::fmt::Display;

use jit_funding_engine::{Decision, DecisionReason};
use serde::{Deserialize, Serialize};

/// The webhook response for an authorization event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub approved: bool,
    pub reason: DecisionReason,
}

impl From<&Decision> for AuthorizationResponse {
    fn from(decision: &Decision) -> Self {
        Self { approved: decision.approved, reason: decision.reason }
    }
}

/// The webhook response for every other event. Webhook responses are always `200 OK`, otherwise the network retries
/// the delivery; `processed: false` signals that the event was not acted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAck {
    pub fn processed() -> Self {
        Self { processed: true, error: None }
    }

    pub fn failure<S: Display>(error: S) -> Self {
        Self { processed: false, error: Some(error.to_string()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceQuery {
    #[serde(default = "default_trace_limit")]
    pub limit: u32,
}

pub const MAX_TRACE_LIMIT: u32 = 100;

fn default_trace_limit() -> u32 {
    20
}

impl TraceQuery {
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_TRACE_LIMIT)
    }
}
