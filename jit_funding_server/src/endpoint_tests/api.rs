use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use jit_common::Secret;
use jit_funding_engine::{
    db_types::{ExecutionTrace, StepStatus, TraceStep},
    AuthorizationStage,
    Decision,
    DecisionReason,
};
use serde_json::json;

use super::{
    helpers::{json, send, ADMIN_KEY},
    mocks::{MockDecider, MockTraceStore},
};
use crate::{
    middleware::{AdminKeyMiddlewareFactory, ADMIN_KEY_HEADER},
    routes::{AuthorizeRoute, TraceForEventRoute, TracesForCardRoute},
    server::json_config,
};

const REQUEST: &str = r#"{"event_token":"evt-7","card_id":"card-1","amount":"12.50","currency":"USD"}"#;

fn configure(key: &str, decider: MockDecider, traces: MockTraceStore) -> impl FnOnce(&mut ServiceConfig) {
    let key = Secret::new(key.to_string());
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(decider)).app_data(web::Data::new(traces)).service(
            web::scope("/api")
                .wrap(AdminKeyMiddlewareFactory::new(key))
                .app_data(json_config())
                .service(AuthorizeRoute::<MockDecider>::new())
                .service(TraceForEventRoute::<MockTraceStore>::new())
                .service(TracesForCardRoute::<MockTraceStore>::new()),
        );
    }
}

fn authorize_request(key: Option<&str>) -> TestRequest {
    let req = TestRequest::post()
        .uri("/api/authorize")
        .insert_header(("content-type", "application/json"))
        .set_payload(REQUEST);
    match key {
        Some(key) => req.insert_header((ADMIN_KEY_HEADER, key)),
        None => req,
    }
}

fn sample_trace(id: i64, event_token: &str) -> ExecutionTrace {
    let now = Utc::now();
    let step = |stage, status| TraceStep { stage, status, timestamp: now, elapsed_us: 12, details: json!({}) };
    ExecutionTrace {
        id,
        event_token: event_token.to_string(),
        card_id: "card-1".to_string(),
        steps: vec![
            step(AuthorizationStage::Start, StepStatus::Passed),
            step(AuthorizationStage::CardLookup, StepStatus::Passed),
            step(AuthorizationStage::CardStatus, StepStatus::Failed),
            step(AuthorizationStage::Denied, StepStatus::Passed),
        ],
        approved: false,
        final_decision: DecisionReason::CardInactive,
        total_latency_ms: 1.5,
        created_at: now,
    }
}

#[actix_web::test]
async fn authorize_without_admin_key() {
    let _ = env_logger::try_init();
    let mut decider = MockDecider::new();
    decider.expect_authorize().never();
    let (status, body) = send(authorize_request(None), configure(ADMIN_KEY, decider, MockTraceStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No admin API key was provided."), "{body}");
}

#[actix_web::test]
async fn authorize_with_wrong_admin_key() {
    let _ = env_logger::try_init();
    let mut decider = MockDecider::new();
    decider.expect_authorize().never();
    let (status, body) =
        send(authorize_request(Some("guess")), configure(ADMIN_KEY, decider, MockTraceStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("The admin API key is invalid."), "{body}");
}

#[actix_web::test]
async fn unconfigured_admin_key_rejects_everything() {
    let _ = env_logger::try_init();
    let mut decider = MockDecider::new();
    decider.expect_authorize().never();
    let (status, _) = send(authorize_request(Some("")), configure("", decider, MockTraceStore::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn delegated_authorization() {
    let _ = env_logger::try_init();
    let mut decider = MockDecider::new();
    decider
        .expect_authorize()
        .withf(|req| req.event_token.as_deref() == Some("evt-7") && req.amount.minor_units() == 1250)
        .times(1)
        .returning(|_| Decision::new(DecisionReason::Approved, Utc::now(), 4));
    let (status, body) =
        send(authorize_request(Some(ADMIN_KEY)), configure(ADMIN_KEY, decider, MockTraceStore::new())).await;
    assert_eq!(status, StatusCode::OK);
    let decision: Decision = serde_json::from_str(&body).unwrap();
    assert!(decision.approved);
    assert_eq!(decision.reason, DecisionReason::Approved);
    assert_eq!(decision.processing_time_ms, 4);
}

#[actix_web::test]
async fn malformed_authorization_request() {
    let _ = env_logger::try_init();
    let mut decider = MockDecider::new();
    decider.expect_authorize().never();
    let req = TestRequest::post()
        .uri("/api/authorize")
        .insert_header(("content-type", "application/json"))
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .set_payload(r#"{"card_id":"card-1","amount":"lots"}"#);
    let (status, body) = send(req, configure(ADMIN_KEY, decider, MockTraceStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"), "{body}");
}

#[actix_web::test]
async fn fetch_trace_for_event() {
    let _ = env_logger::try_init();
    let mut traces = MockTraceStore::new();
    traces
        .expect_fetch_latest_trace()
        .withf(|token| token == "evt-7")
        .times(1)
        .returning(|token| Ok(Some(sample_trace(3, token))));
    let req = TestRequest::get().uri("/api/traces/evt-7").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY));
    let (status, body) = send(req, configure(ADMIN_KEY, MockDecider::new(), traces)).await;
    assert_eq!(status, StatusCode::OK);
    let trace: ExecutionTrace = serde_json::from_str(&body).unwrap();
    assert_eq!(trace.id, 3);
    assert_eq!(trace.final_decision, DecisionReason::CardInactive);
    assert_eq!(trace.steps.len(), 4);
    assert_eq!(trace.steps[2].stage, AuthorizationStage::CardStatus);
}

#[actix_web::test]
async fn missing_trace() {
    let _ = env_logger::try_init();
    let mut traces = MockTraceStore::new();
    traces.expect_fetch_latest_trace().times(1).returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/traces/evt-404").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY));
    let (status, body) = send(req, configure(ADMIN_KEY, MockDecider::new(), traces)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json(&body)["error"].as_str().unwrap().contains("No execution trace for evt-404"), "{body}");
}

#[actix_web::test]
async fn traces_for_card() {
    let _ = env_logger::try_init();
    let mut traces = MockTraceStore::new();
    traces
        .expect_fetch_traces_for_card()
        .withf(|card, limit| card == "card-1" && *limit == 5)
        .times(1)
        .returning(|_, _| Ok(vec![sample_trace(2, "evt-2"), sample_trace(1, "evt-1")]));
    let req = TestRequest::get().uri("/api/cards/card-1/traces?limit=5").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY));
    let (status, body) = send(req, configure(ADMIN_KEY, MockDecider::new(), traces)).await;
    assert_eq!(status, StatusCode::OK);
    let traces: Vec<ExecutionTrace> = serde_json::from_str(&body).unwrap();
    assert_eq!(traces.iter().map(|t| t.id).collect::<Vec<_>>(), vec![2, 1]);
}

#[actix_web::test]
async fn trace_limits_are_clamped() {
    let _ = env_logger::try_init();
    let mut traces = MockTraceStore::new();
    traces.expect_fetch_traces_for_card().withf(|_, limit| *limit == 100).times(1).returning(|_, _| Ok(vec![]));
    let req = TestRequest::get().uri("/api/cards/card-1/traces?limit=5000").insert_header((ADMIN_KEY_HEADER, ADMIN_KEY));
    let (status, body) = send(req, configure(ADMIN_KEY, MockDecider::new(), traces)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}
