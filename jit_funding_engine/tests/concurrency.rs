use chrono::Utc;
use futures_util::future::join_all;
use jit_common::Amount;
use jit_funding_engine::{
    day_bucket,
    db_types::{AccountType, CardStatus},
    events::EventProducers,
    test_utils::seed,
    AuthorizationRequest,
    DecisionReason,
    JitConfig,
    LimitEnforcement,
};
use support::{setup, tear_down, usd, TestApi};

mod support;

const BURST: usize = 20;
const BURST_AMOUNT: &str = "50";

async fn burst_fixture(mode: LimitEnforcement) -> TestApi {
    let api = setup(JitConfig::default().with_limit_enforcement(mode), EventProducers::default()).await;
    seed::user(api.db(), "dave", AccountType::Business).await;
    seed::card(api.db(), "card-d", "dave", CardStatus::Active, Some(usd("500")), None).await;
    api
}

/// Fires `BURST` concurrent requests for 50.00 and returns how many were approved.
async fn burst(api: &TestApi) -> usize {
    let tasks = (0..BURST).map(|i| {
        let api = api.clone();
        tokio::spawn(async move {
            let request = AuthorizationRequest::new("card-d", usd(BURST_AMOUNT)).with_event_token(format!("burst-{i}"));
            api.authorize(request).await
        })
    });
    let decisions = join_all(tasks).await.into_iter().map(|r| r.expect("Task panicked")).collect::<Vec<_>>();
    for d in &decisions {
        assert!(
            matches!(d.reason, DecisionReason::Approved | DecisionReason::DailyLimitExceeded),
            "Unexpected decision {}",
            d.reason
        );
    }
    decisions.iter().filter(|d| d.approved).count()
}

fn approved_total(approved: usize) -> Amount {
    let count = i64::try_from(approved).expect("Approval count overflow");
    Amount::from_minor_units(usd(BURST_AMOUNT).minor_units() * count)
}

async fn spent_today(api: &TestApi) -> Amount {
    api.db().fetch_spending_counter("card-d", &day_bucket(Utc::now())).await.unwrap().unwrap_or_default()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn strict_enforcement_never_exceeds_the_daily_limit() {
    let api = burst_fixture(LimitEnforcement::Strict).await;
    let approved = burst(&api).await;
    assert_eq!(approved, 10);
    assert_eq!(spent_today(&api).await, usd("500"));
    assert_eq!(approved_total(approved), usd("500"));
    tear_down(api.db()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn soft_enforcement_counts_every_approval() {
    let api = burst_fixture(LimitEnforcement::Soft).await;
    let approved = burst(&api).await;
    let total = approved_total(approved);
    // Racing requests may overshoot, but every approval is counted and at least the limit's worth is approved
    assert!(approved >= 10);
    assert_eq!(spent_today(&api).await, total);
    // Soft limits: each approval saw at most `limit - amount` already spent, and can only have missed the increments of
    // the other requests in flight. So the overshoot is bounded by `(in_flight - 1) * amount`.
    let in_flight = i64::try_from(BURST - 1).expect("Burst size overflow");
    let bound = usd("500").minor_units() + in_flight * usd(BURST_AMOUNT).minor_units();
    assert!(total.minor_units() <= bound, "Soft limit overshoot {total} exceeds {bound} minor units");
    // Once the counter has settled, the limit holds
    let late = api.authorize(AuthorizationRequest::new("card-d", usd("0.01"))).await;
    assert_eq!(late.reason, DecisionReason::DailyLimitExceeded);
    tear_down(api.db()).await;
}

#[tokio::test]
async fn sequential_approvals_stop_at_the_limit() {
    let api = burst_fixture(LimitEnforcement::Soft).await;
    let mut approved = 0;
    for i in 0..BURST {
        let request = AuthorizationRequest::new("card-d", usd("50")).with_event_token(format!("seq-{i}"));
        if api.authorize(request).await.approved {
            approved += 1;
        }
    }
    assert_eq!(approved, 10);
    assert_eq!(spent_today(&api).await, usd("500"));
    tear_down(api.db()).await;
}
