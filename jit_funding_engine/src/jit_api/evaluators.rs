//! The authorization rules.
//!
//! Each evaluator is a pure function of state the orchestrator has already loaded. None of them touch the store or
//! the cache, so they can be tested (and reasoned about) in isolation.
use jit_common::Amount;
use serde_json::{json, Value};

use crate::{
    db_types::{Card, MerchantRestrictions, SpendingControl, SpendingTotals, User},
    jit_api::authorization_objects::DecisionReason,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub details: Value,
}

impl Verdict {
    pub fn allow(details: Value) -> Self {
        Self { allowed: true, reason: DecisionReason::Approved, details }
    }

    pub fn deny(reason: DecisionReason, details: Value) -> Self {
        Self { allowed: false, reason, details }
    }
}

/// The limits that apply to a card once spending-control overrides are taken into account.
///
/// A control override applies if it is set and positive. Otherwise the card's own limit applies if it is set and
/// positive. Otherwise there is no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectiveLimits {
    pub daily: Option<Amount>,
    pub monthly: Option<Amount>,
}

impl EffectiveLimits {
    pub fn resolve(card: &Card, control: Option<&SpendingControl>) -> Self {
        let pick = |over: Option<Amount>, base: Option<Amount>| {
            over.filter(Amount::is_positive).or_else(|| base.filter(Amount::is_positive))
        };
        Self {
            daily: pick(control.and_then(|c| c.daily_limit), card.daily_limit),
            monthly: pick(control.and_then(|c| c.monthly_limit), card.monthly_limit),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.daily.is_none() && self.monthly.is_none()
    }
}

/// Only positive amounts can be funded. Refunds and reversals arrive as their own network events.
pub fn amount(amount: Amount) -> Verdict {
    if amount.is_positive() {
        Verdict::allow(json!({ "amount": amount }))
    } else {
        Verdict::deny(DecisionReason::InvalidAmount, json!({ "amount": amount }))
    }
}

pub fn card_lookup(card_id: &str, card: Option<&Card>) -> Verdict {
    match card {
        Some(c) => Verdict::allow(json!({ "card_id": card_id, "user_id": c.user_id })),
        None => Verdict::deny(DecisionReason::CardNotFound, json!({ "card_id": card_id })),
    }
}

pub fn card_status(card: &Card) -> Verdict {
    let details = json!({ "status": card.status });
    if card.is_active() {
        Verdict::allow(details)
    } else {
        Verdict::deny(DecisionReason::CardInactive, details)
    }
}

pub fn user_lookup(user_id: &str, user: Option<&User>) -> Verdict {
    match user {
        Some(u) => Verdict::allow(json!({ "user_id": user_id, "account_type": u.account_type })),
        None => Verdict::deny(DecisionReason::UserNotFound, json!({ "user_id": user_id })),
    }
}

/// Denies when `spent + amount` would exceed an effective limit. Hitting the limit exactly is allowed. A sum that
/// overflows exceeds every limit.
pub fn spending_limits(limits: &EffectiveLimits, totals: &SpendingTotals, amount: Amount) -> Verdict {
    let exceeds = |spent: Amount, limit: Amount| spent.checked_add(amount).map_or(true, |total| total > limit);
    if let Some(limit) = limits.daily {
        if exceeds(totals.daily, limit) {
            return Verdict::deny(
                DecisionReason::DailyLimitExceeded,
                json!({ "limit": limit, "spent": totals.daily, "attempted": amount }),
            );
        }
    }
    if let Some(limit) = limits.monthly {
        if exceeds(totals.monthly, limit) {
            return Verdict::deny(
                DecisionReason::MonthlyLimitExceeded,
                json!({ "limit": limit, "spent": totals.monthly, "attempted": amount }),
            );
        }
    }
    Verdict::allow(json!({
        "daily_limit": limits.daily,
        "monthly_limit": limits.monthly,
        "daily_spent": totals.daily,
        "monthly_spent": totals.monthly,
        "attempted": amount,
    }))
}

fn contains_merchant(list: &[String], name: &str) -> bool {
    list.iter().any(|m| m.trim().eq_ignore_ascii_case(name.trim()))
}

/// Applies the card's merchant restrictions. Blocks take precedence over the whitelist. A card without controls is
/// unrestricted.
pub fn merchant_controls(control: Option<&SpendingControl>, merchant: Option<&str>, category: Option<&str>) -> Verdict {
    let Some(control) = control else {
        return Verdict::allow(json!({ "restrictions": "none" }));
    };
    let restrictions: MerchantRestrictions = match control.merchant_restrictions() {
        Ok(r) => r,
        Err(e) => {
            return Verdict::deny(DecisionReason::MerchantCheckError, json!({ "error": e.to_string() }));
        },
    };
    let details = json!({ "merchant": merchant, "category": category });
    if let Some(name) = merchant {
        if contains_merchant(&restrictions.blocked_merchants, name) {
            return Verdict::deny(DecisionReason::MerchantBlocked, details);
        }
    }
    if let Some(mcc) = category {
        if restrictions.blocked_categories.iter().any(|c| c.trim() == mcc.trim()) {
            return Verdict::deny(DecisionReason::CategoryBlocked, details);
        }
    }
    if !restrictions.allowed_merchants.is_empty() &&
        !merchant.map(|name| contains_merchant(&restrictions.allowed_merchants, name)).unwrap_or(false)
    {
        return Verdict::deny(DecisionReason::MerchantNotAllowed, details);
    }
    Verdict::allow(details)
}

/// Checks a personal account's wallet in the transaction currency.
pub fn balance(wallet: Option<Amount>, amount: Amount, currency: &str) -> Verdict {
    match wallet {
        None => Verdict::deny(DecisionReason::CurrencyWalletNotFound, json!({ "currency": currency })),
        Some(balance) if balance < amount => Verdict::deny(
            DecisionReason::InsufficientFunds,
            json!({ "balance": balance, "attempted": amount, "currency": currency }),
        ),
        Some(balance) => Verdict::allow(json!({ "balance": balance, "attempted": amount, "currency": currency })),
    }
}
