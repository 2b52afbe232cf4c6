use std::sync::Arc;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use jit_common::{Amount, Secret};
use jit_funding_engine::{
    cache::{CacheBackend, MemoryCache, ReadThroughCache},
    db_types::CardStatus,
    events::EventProducers,
    jit_api::network_objects::ClearingJob,
    queue::{JobFuture, JobHandler, JobQueue, RetryPolicy},
    Decision,
    DecisionReason,
    NetworkEventApi,
    StoreError,
};

use super::{
    helpers::{json, post_webhook, sign, SIGNATURE_HEADER, WEBHOOK_SECRET},
    mocks::{MockDecider, MockNetworkStore},
};
use crate::{config::ServerOptions, middleware::HmacMiddlewareFactory, webhook_routes::NetworkWebhookRoute};

const AUTHORIZATION: &str = r#"{"type":"transaction.authorization","transaction":{"token":"evt-100","card_token":"card-1","user_token":"alice","amount":4500,"currency_code":"USD","merchant":{"name":"Coffee Shop","mcc":"5814"}}}"#;
const CLEARING: &str = r#"{"type":"transaction.clearing","transaction":{"token":"evt-100","card_token":"card-1","amount":4500}}"#;

/// A clearing queue that is never drained, so that its single slot fills up.
fn stalled_queue() -> JobQueue<ClearingJob> {
    let handler: JobHandler<ClearingJob> = Arc::new(|_| Box::pin(async { Ok(()) }) as JobFuture);
    JobQueue::new(1, RetryPolicy::default(), handler)
}

fn configure(
    decider: MockDecider,
    store: MockNetworkStore,
    queue: &JobQueue<ClearingJob>,
) -> impl FnOnce(&mut ServiceConfig) {
    let publisher = queue.publisher();
    move |cfg: &mut ServiceConfig| {
        let cache = ReadThroughCache::new(CacheBackend::from(MemoryCache::new(10)));
        let events = NetworkEventApi::new(store, cache, EventProducers::default());
        cfg.app_data(web::Data::new(ServerOptions::default()))
            .app_data(web::Data::new(decider))
            .app_data(web::Data::new(events))
            .app_data(web::Data::new(publisher))
            .service(
                web::scope("/webhooks")
                    .wrap(HmacMiddlewareFactory::new(SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true))
                    .service(NetworkWebhookRoute::<MockDecider, MockNetworkStore>::new()),
            );
    }
}

fn silent_decider() -> MockDecider {
    let mut decider = MockDecider::new();
    decider.expect_authorize().never();
    decider
}

#[actix_web::test]
async fn unsigned_deliveries_are_rejected() {
    let _ = env_logger::try_init();
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(AUTHORIZATION, None, configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("x-network-signature"), "{body}");
}

#[actix_web::test]
async fn forged_signatures_are_rejected() {
    let _ = env_logger::try_init();
    let queue = stalled_queue();
    let forged = sign(CLEARING);
    let (status, _) =
        post_webhook(AUTHORIZATION, Some(forged), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn authorization_events_are_decided() {
    let _ = env_logger::try_init();
    let mut decider = MockDecider::new();
    decider
        .expect_authorize()
        .withf(|req| {
            req.event_token.as_deref() == Some("evt-100") &&
                req.card_id == "card-1" &&
                req.amount == Amount::from_minor_units(4500) &&
                req.merchant_name.as_deref() == Some("Coffee Shop") &&
                req.merchant_category.as_deref() == Some("5814")
        })
        .times(1)
        .returning(|_| Decision::new(DecisionReason::Approved, Utc::now(), 3));
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(AUTHORIZATION, Some(sign(AUTHORIZATION)), configure(decider, MockNetworkStore::new(), &queue))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"approved":true,"reason":"APPROVED"}"#);
}

#[actix_web::test]
async fn payment_control_events_are_decided() {
    let _ = env_logger::try_init();
    let event = AUTHORIZATION.replace("transaction.authorization", "jit.funding.paymentcontrol");
    let mut decider = MockDecider::new();
    decider.expect_authorize().times(1).returning(|_| Decision::new(DecisionReason::DailyLimitExceeded, Utc::now(), 2));
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(&event, Some(sign(&event)), configure(decider, MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"approved":false,"reason":"DAILY_LIMIT_EXCEEDED"}"#);
}

#[actix_web::test]
async fn clearing_events_are_queued() {
    let _ = env_logger::try_init();
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(CLEARING, Some(sign(CLEARING)), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"processed":true}"#);
    // The queue's only slot is taken, and nothing drains it
    let (status, body) =
        post_webhook(CLEARING, Some(sign(CLEARING)), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&body);
    assert_eq!(ack["processed"], false);
    assert_eq!(ack["error"], "The job queue is full");
}

#[actix_web::test]
async fn settlement_without_a_transaction() {
    let _ = env_logger::try_init();
    let event = r#"{"type":"transaction.settlement"}"#;
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(event, Some(sign(event)), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&body);
    assert_eq!(ack["processed"], false);
    assert_eq!(ack["error"], "The transaction.settlement event has no transaction payload");
}

#[actix_web::test]
async fn card_state_changes_are_applied() {
    let _ = env_logger::try_init();
    let event = r#"{"type":"cardstatechange","card":{"card_token":"card-1","state":"SUSPENDED","reason":"lost"}}"#;
    let mut store = MockNetworkStore::new();
    store
        .expect_update_card_status()
        .withf(|card, status| card == "card-1" && *status == CardStatus::Frozen)
        .times(1)
        .returning(|_, _| Ok(true));
    let queue = stalled_queue();
    let (status, body) = post_webhook(event, Some(sign(event)), configure(silent_decider(), store, &queue)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"processed":true}"#);
}

#[actix_web::test]
async fn state_changes_for_unknown_cards_are_acknowledged() {
    let _ = env_logger::try_init();
    let event = r#"{"type":"card.statechange","card":{"card_token":"ghost","state":"TERMINATED"}}"#;
    let mut store = MockNetworkStore::new();
    store.expect_update_card_status().times(1).returning(|_, _| Ok(false));
    let queue = stalled_queue();
    let (status, body) = post_webhook(event, Some(sign(event)), configure(silent_decider(), store, &queue)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"processed":true}"#);
}

#[actix_web::test]
async fn store_failures_still_return_ok() {
    let _ = env_logger::try_init();
    let event = r#"{"type":"cardstatechange","card":{"card_token":"card-1","state":"ACTIVE"}}"#;
    let mut store = MockNetworkStore::new();
    store
        .expect_update_card_status()
        .times(1)
        .returning(|_, _| Err(StoreError::DatabaseError("disk I/O error".into())));
    let queue = stalled_queue();
    let (status, body) = post_webhook(event, Some(sign(event)), configure(silent_decider(), store, &queue)).await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&body);
    assert_eq!(ack["processed"], false);
    assert!(ack["error"].as_str().unwrap().contains("disk I/O error"), "{body}");
}

#[actix_web::test]
async fn malformed_events() {
    let _ = env_logger::try_init();
    let event = r#"{"transaction": 42"#;
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(event, Some(sign(event)), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    let ack = json(&body);
    assert_eq!(ack["processed"], false);
    assert!(ack["error"].as_str().unwrap().starts_with("Malformed event."), "{body}");
}

#[actix_web::test]
async fn unsupported_events() {
    let _ = env_logger::try_init();
    let event = r#"{"type":"chargeback.transition"}"#;
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(event, Some(sign(event)), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    // Acknowledged, so the network stops redelivering it
    assert_eq!(body, r#"{"processed":true}"#);
}

#[actix_web::test]
async fn authorization_without_a_transaction() {
    let _ = env_logger::try_init();
    let event = r#"{"type":"transaction.authorization"}"#;
    let queue = stalled_queue();
    let (status, body) =
        post_webhook(event, Some(sign(event)), configure(silent_decider(), MockNetworkStore::new(), &queue)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["approved"], false);
    assert_eq!(body["reason"], "SYSTEM_ERROR");
    assert!(body.get("processed").is_none());
}
