use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    db_types::{NewExecutionTrace, StepStatus, TraceStep},
    jit_api::{
        authorization_objects::{AuthorizationRequest, AuthorizationStage, DecisionReason, ReasonKind},
        evaluators::Verdict,
    },
};

/// Collects the stage results of one authorization attempt.
///
/// Each step's elapsed time is measured from the end of the previous step, so it covers the loads the stage needed as
/// well as the rule itself.
pub struct TraceRecorder {
    event_token: String,
    card_id: String,
    started: Instant,
    last: Instant,
    steps: Vec<TraceStep>,
}

impl TraceRecorder {
    pub fn start(event_token: &str, request: &AuthorizationRequest) -> Self {
        let now = Instant::now();
        let mut recorder = Self {
            event_token: event_token.to_string(),
            card_id: request.card_id.clone(),
            started: now,
            last: now,
            steps: Vec::with_capacity(10),
        };
        recorder.record(
            AuthorizationStage::Start,
            StepStatus::Passed,
            json!({
                "amount": request.amount,
                "currency": request.currency,
                "merchant": request.merchant_name,
                "category": request.merchant_category,
            }),
        );
        recorder
    }

    pub fn record(&mut self, stage: AuthorizationStage, status: StepStatus, details: Value) {
        let now = Instant::now();
        let elapsed_us = u64::try_from(now.duration_since(self.last).as_micros()).unwrap_or(u64::MAX);
        self.last = now;
        self.steps.push(TraceStep { stage, status, timestamp: Utc::now(), elapsed_us, details });
    }

    /// Records the verdict as a passed or failed step, and returns whether it allowed the transaction.
    pub fn verdict(&mut self, stage: AuthorizationStage, verdict: &Verdict) -> bool {
        let status = if verdict.allowed { StepStatus::Passed } else { StepStatus::Failed };
        let details = if verdict.allowed {
            verdict.details.clone()
        } else {
            with_reason(verdict.reason, verdict.details.clone())
        };
        self.record(stage, status, details);
        verdict.allowed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Closes the trace with a terminal step for the final decision.
    pub fn finish(mut self, reason: DecisionReason, details: Value) -> NewExecutionTrace {
        let (stage, status) = match (reason, reason.kind()) {
            (DecisionReason::Approved, _) => (AuthorizationStage::Approved, StepStatus::Passed),
            (DecisionReason::SystemError, _) => (AuthorizationStage::SystemError, StepStatus::Error),
            (_, ReasonKind::System) => (AuthorizationStage::Denied, StepStatus::Error),
            _ => (AuthorizationStage::Denied, StepStatus::Failed),
        };
        self.record(stage, status, with_reason(reason, details));
        let total_latency_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        NewExecutionTrace {
            event_token: self.event_token,
            card_id: self.card_id,
            steps: self.steps,
            approved: reason.is_approval(),
            final_decision: reason,
            total_latency_ms,
        }
    }
}

/// Tags step details with the decision reason. Object details keep their keys at the top level.
fn with_reason(reason: DecisionReason, details: Value) -> Value {
    match details {
        Value::Null => json!({ "reason": reason }),
        Value::Object(mut map) => {
            map.insert("reason".into(), json!(reason));
            Value::Object(map)
        },
        other => json!({ "reason": reason, "details": other }),
    }
}
