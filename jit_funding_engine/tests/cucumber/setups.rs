use cucumber::given;
use jit_common::Amount;
use jit_funding_engine::{
    day_bucket,
    db_types::{AccountType, CardStatus, MerchantRestrictions},
    test_utils::seed,
};

use crate::cucumber::{jit_world::AuthorizationSystem, JitWorld};

fn amount(s: &str) -> Amount {
    s.parse().expect("Not a valid amount")
}

#[given("a fresh install")]
async fn fresh_database(world: &mut JitWorld) {
    let system = AuthorizationSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a {word} user '{word}' with {word} {word} in their wallet")]
async fn user_with_wallet(world: &mut JitWorld, kind: String, user_id: String, balance: String, currency: String) {
    let account_type = match kind.as_str() {
        "business" => AccountType::Business,
        _ => AccountType::Personal,
    };
    seed::user(world.db(), &user_id, account_type).await;
    seed::wallet(world.db(), &user_id, &currency, amount(&balance)).await;
}

#[given(expr = "a {word} user '{word}' without a wallet")]
async fn user_without_wallet(world: &mut JitWorld, kind: String, user_id: String) {
    let account_type = match kind.as_str() {
        "business" => AccountType::Business,
        _ => AccountType::Personal,
    };
    seed::user(world.db(), &user_id, account_type).await;
}

#[given(expr = "an active card '{word}' for '{word}' with a daily limit of {word}")]
async fn card_with_daily_limit(world: &mut JitWorld, card_id: String, user_id: String, limit: String) {
    seed::card(world.db(), &card_id, &user_id, CardStatus::Active, Some(amount(&limit)), None).await;
}

#[given(expr = "an active card '{word}' for '{word}' with no limits")]
async fn card_without_limits(world: &mut JitWorld, card_id: String, user_id: String) {
    seed::card(world.db(), &card_id, &user_id, CardStatus::Active, None, None).await;
}

#[given(expr = "a {word} card '{word}' for '{word}'")]
async fn card_with_status(world: &mut JitWorld, status: String, card_id: String, user_id: String) {
    let status = status.parse::<CardStatus>().expect("Not a card status");
    seed::card(world.db(), &card_id, &user_id, status, None, None).await;
}

#[given(expr = "card '{word}' has already spent {word} today")]
async fn prior_spend(world: &mut JitWorld, card_id: String, spent: String) {
    let today = day_bucket(chrono::Utc::now());
    seed::prior_spend(world.db(), &card_id, &today, amount(&spent)).await;
}

#[given(expr = "card '{word}' blocks merchant '{word}'")]
async fn block_merchant(world: &mut JitWorld, card_id: String, merchant: String) {
    let restrictions = MerchantRestrictions { blocked_merchants: vec![merchant], ..Default::default() };
    seed::control(world.db(), &card_id, None, None, Some(&restrictions)).await;
}

#[given(expr = "card '{word}' only allows merchant '{word}'")]
async fn allow_merchant(world: &mut JitWorld, card_id: String, merchant: String) {
    let restrictions = MerchantRestrictions { allowed_merchants: vec![merchant], ..Default::default() };
    seed::control(world.db(), &card_id, None, None, Some(&restrictions)).await;
}
