use std::{fmt::Debug, panic::AssertUnwindSafe, time::Duration};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use log::*;
use serde_json::{json, Value};

use crate::{
    cache::{CacheStore, ReadThroughCache},
    db::traits::{day_bucket, month_bucket, AuthorizationDatabase, TraceManagement},
    db_types::{AccountType, NewExecutionTrace, StepStatus},
    events::{AuthorizationDecidedEvent, EventProducers},
    jit_api::{
        authorization_objects::{AuthorizationRequest, AuthorizationStage, Decision, DecisionReason},
        config::{JitConfig, LimitEnforcement},
        errors::JitError,
        evaluators::{self, EffectiveLimits},
        fallback::Authorizer,
        new_event_token,
        trace_recorder::TraceRecorder,
    },
};

/// `JitFundingApi` is the authorization orchestrator. It takes an authorization request through each rule stage in
/// order, stops at the first denial, and on approval records the spend against the card's daily counter.
///
/// [`authorize`](JitFundingApi::authorize) cannot fail. Store errors, and even panics in the pipeline, become
/// `SYSTEM_ERROR` decisions. Every call leaves exactly one execution trace behind.
pub struct JitFundingApi<B, C> {
    db: B,
    cache: ReadThroughCache<C>,
    config: JitConfig,
    producers: EventProducers,
}

impl<B, C> Debug for JitFundingApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JitFundingApi ({:?})", self.config)
    }
}

impl<B: Clone, C: Clone> Clone for JitFundingApi<B, C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            cache: self.cache.clone(),
            config: self.config,
            producers: self.producers.clone(),
        }
    }
}

impl<B, C> JitFundingApi<B, C> {
    pub fn new(db: B, cache: ReadThroughCache<C>, config: JitConfig, producers: EventProducers) -> Self {
        Self { db, cache, config, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn cache(&self) -> &ReadThroughCache<C> {
        &self.cache
    }

    pub fn config(&self) -> &JitConfig {
        &self.config
    }
}

impl<B, C> JitFundingApi<B, C>
where
    B: AuthorizationDatabase + TraceManagement,
    C: CacheStore,
{
    /// Decide whether to fund the transaction.
    pub async fn authorize(&self, request: AuthorizationRequest) -> Decision {
        let now = Utc::now();
        let event_token = request.event_token.clone().unwrap_or_else(new_event_token);
        let mut recorder = TraceRecorder::start(&event_token, &request);
        let outcome = AssertUnwindSafe(self.evaluate(&request, now, &mut recorder)).catch_unwind().await;
        let (reason, details) = match outcome {
            Ok(Ok(reason)) => (reason, Value::Null),
            Ok(Err(e)) => {
                error!("⚖️ Authorization {event_token} for card {} failed. {e}", request.card_id);
                (DecisionReason::SystemError, json!({ "error": e.to_string() }))
            },
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                error!("⚖️ Authorization {event_token} for card {} panicked. {msg}", request.card_id);
                (DecisionReason::SystemError, json!({ "error": format!("panic: {msg}") }))
            },
        };
        let elapsed = recorder.elapsed();
        let decision = Decision::new(reason, now, u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self.persist_trace(recorder.finish(reason, details)).await;
        self.check_budget(&event_token, elapsed);
        info!(
            "⚖️ Authorization {event_token} for {} {} on card {}: {} ({}ms)",
            request.amount, request.currency, request.card_id, decision.reason, decision.processing_time_ms
        );
        self.notify_decision(&event_token, &request, &decision);
        decision
    }

    async fn evaluate(
        &self,
        request: &AuthorizationRequest,
        now: DateTime<Utc>,
        trace: &mut TraceRecorder,
    ) -> Result<DecisionReason, JitError> {
        let verdict = evaluators::amount(request.amount);
        if !verdict.allowed {
            trace.verdict(AuthorizationStage::Start, &verdict);
            return Ok(verdict.reason);
        }

        // Card
        let card = match self.cache.card(&self.db, &request.card_id).await {
            Ok(card) => card,
            Err(e) => {
                trace.record(AuthorizationStage::CardLookup, StepStatus::Error, json!({ "error": e.to_string() }));
                return Err(e.into());
            },
        };
        let verdict = evaluators::card_lookup(&request.card_id, card.as_ref());
        trace.verdict(AuthorizationStage::CardLookup, &verdict);
        let Some(card) = card else {
            return Ok(verdict.reason);
        };
        let verdict = evaluators::card_status(&card);
        if !trace.verdict(AuthorizationStage::CardStatus, &verdict) {
            return Ok(verdict.reason);
        }

        // User
        if let Some(user_id) = request.user_id.as_deref().filter(|u| *u != card.user_id) {
            warn!("⚖️ Request names user {user_id}, but card {} belongs to {}. Using the card owner.", card.id, card.user_id);
        }
        let user = match self.cache.user(&self.db, &card.user_id).await {
            Ok(user) => user,
            Err(e) => {
                trace.record(AuthorizationStage::UserLookup, StepStatus::Error, json!({ "error": e.to_string() }));
                return Err(e.into());
            },
        };
        let verdict = evaluators::user_lookup(&card.user_id, user.as_ref());
        trace.verdict(AuthorizationStage::UserLookup, &verdict);
        let Some(user) = user else {
            return Ok(verdict.reason);
        };

        // Spending limits
        let day = day_bucket(now);
        let control = match self.db.fetch_spending_control(&card.id).await {
            Ok(control) => control,
            Err(e) => return Ok(check_error(trace, AuthorizationStage::SpendingLimits, DecisionReason::LimitCheckError, e)),
        };
        let limits = EffectiveLimits::resolve(&card, control.as_ref());
        if limits.is_unlimited() {
            trace.record(AuthorizationStage::SpendingLimits, StepStatus::Skipped, json!({ "limits": "none" }));
        } else {
            let totals = match self.db.fetch_spending_totals(&card.id, &day, &month_bucket(now)).await {
                Ok(totals) => totals,
                Err(e) => {
                    return Ok(check_error(trace, AuthorizationStage::SpendingLimits, DecisionReason::LimitCheckError, e))
                },
            };
            let verdict = evaluators::spending_limits(&limits, &totals, request.amount);
            if !trace.verdict(AuthorizationStage::SpendingLimits, &verdict) {
                return Ok(verdict.reason);
            }
        }

        // Merchant controls
        let verdict = evaluators::merchant_controls(
            control.as_ref(),
            request.merchant_name.as_deref(),
            request.merchant_category.as_deref(),
        );
        if !trace.verdict(AuthorizationStage::MerchantControls, &verdict) {
            return Ok(verdict.reason);
        }

        // Balance
        match user.account_type {
            AccountType::Business => {
                trace.record(AuthorizationStage::BalanceCheck, StepStatus::Skipped, json!({ "account_type": "business" }));
            },
            AccountType::Personal => {
                let wallet = match self.db.fetch_wallet_balance(&user.id, &request.currency).await {
                    Ok(wallet) => wallet,
                    Err(e) => {
                        return Ok(check_error(trace, AuthorizationStage::BalanceCheck, DecisionReason::BalanceCheckError, e))
                    },
                };
                let verdict = evaluators::balance(wallet, request.amount, &request.currency);
                if !trace.verdict(AuthorizationStage::BalanceCheck, &verdict) {
                    return Ok(verdict.reason);
                }
            },
        }

        // Counter update
        let ceiling = match self.config.limit_enforcement {
            LimitEnforcement::Soft => None,
            LimitEnforcement::Strict => limits.daily,
        };
        match self.db.increment_spending_counter(&card.id, &day, request.amount, ceiling).await {
            Ok(Some(total)) => {
                trace.record(
                    AuthorizationStage::CounterUpdate,
                    StepStatus::Passed,
                    json!({ "day": day, "daily_total": total, "enforcement": self.config.limit_enforcement }),
                );
                self.cache.invalidate_card(&card.id).await;
            },
            Ok(None) => {
                debug!("⚖️ Strict daily limit rejected the counter update for card {}", card.id);
                trace.record(
                    AuthorizationStage::CounterUpdate,
                    StepStatus::Failed,
                    json!({ "reason": DecisionReason::DailyLimitExceeded, "limit": ceiling, "attempted": request.amount }),
                );
                return Ok(DecisionReason::DailyLimitExceeded);
            },
            Err(e) => {
                // The approval stands. The counter will under-report this spend.
                error!("⚖️ Could not update the spending counter for card {}. {e}", card.id);
                trace.record(AuthorizationStage::CounterUpdate, StepStatus::Error, json!({ "error": e.to_string() }));
            },
        }
        Ok(DecisionReason::Approved)
    }

    async fn persist_trace(&self, trace: NewExecutionTrace) {
        let token = trace.event_token.clone();
        if let Err(e) = self.db.insert_trace(trace).await {
            error!("⚖️ Could not save the execution trace for {token}. {e}");
        }
    }

    fn check_budget(&self, event_token: &str, elapsed: Duration) {
        let budget = self.config.decision_budget;
        if elapsed > budget {
            warn!(
                "⚖️ Slow authorization decision for {event_token}: {}ms exceeds the {}ms budget",
                elapsed.as_millis(),
                budget.as_millis()
            );
        } else if elapsed > budget / 2 {
            debug!("⚖️ Authorization decision for {event_token} took {}ms", elapsed.as_millis());
        }
    }

    fn notify_decision(&self, event_token: &str, request: &AuthorizationRequest, decision: &Decision) {
        for producer in &self.producers.authorization_decided_producer {
            let event = AuthorizationDecidedEvent {
                event_token: event_token.to_string(),
                card_id: request.card_id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                decision: decision.clone(),
            };
            producer.publish_event(event);
        }
    }
}

impl<B, C> Authorizer for JitFundingApi<B, C>
where
    B: AuthorizationDatabase + TraceManagement,
    C: CacheStore,
{
    async fn authorize(&self, request: AuthorizationRequest) -> Decision {
        JitFundingApi::authorize(self, request).await
    }
}

/// Records a failed load as an error step and turns it into the stage's conservative denial.
fn check_error<E: std::fmt::Display>(
    trace: &mut TraceRecorder,
    stage: AuthorizationStage,
    reason: DecisionReason,
    e: E,
) -> DecisionReason {
    warn!("⚖️ {stage} could not be evaluated. Declining with {reason}. {e}");
    trace.record(stage, StepStatus::Error, json!({ "reason": reason, "error": e.to_string() }));
    reason
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
