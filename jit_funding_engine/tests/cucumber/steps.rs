use cucumber::{then, when};
use jit_common::Amount;
use jit_funding_engine::{
    day_bucket,
    jit_api::authorization_objects::AuthorizationStage,
    AuthorizationRequest,
    DecisionReason,
    TraceManagement,
};

use crate::cucumber::JitWorld;

#[when(expr = "card '{word}' requests {word} at '{word}'")]
async fn request_authorization(world: &mut JitWorld, card_id: String, amount: String, merchant: String) {
    let amount = amount.parse::<Amount>().expect("Not a valid amount");
    let token = format!("evt-{card_id}-{}", rand::random::<u32>());
    let request = AuthorizationRequest::new(card_id, amount).with_event_token(token.clone()).with_merchant(merchant, None);
    let decision = world.api().authorize(request).await;
    world.last_decision = Some((token, decision));
}

#[then("the transaction is approved")]
async fn approved(world: &mut JitWorld) {
    let (_, decision) = world.last_decision();
    assert!(decision.approved, "Expected an approval, got {}", decision.reason);
    assert_eq!(decision.reason, DecisionReason::Approved);
}

#[then(expr = "the transaction is declined with {word}")]
async fn declined(world: &mut JitWorld, reason: String) {
    let (_, decision) = world.last_decision();
    let expected = reason.parse::<DecisionReason>().expect("Not a decision reason");
    assert!(!decision.approved);
    assert_eq!(decision.reason, expected);
}

#[then(expr = "card '{word}' has spent {word} today")]
async fn spent_today(world: &mut JitWorld, card_id: String, spent: String) {
    let expected = spent.parse::<Amount>().expect("Not a valid amount");
    let today = day_bucket(chrono::Utc::now());
    let actual = world.db().fetch_spending_counter(&card_id, &today).await.expect("Error fetching counter");
    assert_eq!(actual.unwrap_or_default(), expected);
}

#[then(expr = "the decision is traced ending in {word}")]
async fn traced(world: &mut JitWorld, stage: String) {
    let (token, decision) = world.last_decision().clone();
    let traces = world.db().fetch_traces_for_event(&token).await.expect("Error fetching traces");
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(trace.final_decision, decision.reason);
    assert_eq!(trace.approved, decision.approved);
    let last = trace.steps.last().expect("Trace has no steps");
    let expected: AuthorizationStage = serde_json::from_value(serde_json::json!(stage)).expect("Not a stage name");
    assert_eq!(last.stage, expected);
}
