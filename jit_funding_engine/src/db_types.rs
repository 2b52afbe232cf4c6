//! Records held by the durable store, and the shapes in which they are passed around the engine.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use jit_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::jit_api::authorization_objects::{AuthorizationStage, DecisionReason};

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion from string: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------     AccountStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Closed,
}

//--------------------------------------      AccountType      ---------------------------------------------------------
/// Personal accounts fund card spend from their own wallet balances. Business accounts settle through a separate
/// path, so the balance stage is skipped for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Personal,
    Business,
}

//--------------------------------------          User         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub status: AccountStatus,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       CardStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    #[default]
    Active,
    Frozen,
    Terminated,
}

impl CardStatus {
    /// Maps the lifecycle state reported by the card network onto a local card status. Unknown states map to
    /// `Active`, which is how the network treats cards it has not suspended or terminated.
    pub fn from_network_state(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "SUSPENDED" => Self::Frozen,
            "TERMINATED" => Self::Terminated,
            _ => Self::Active,
        }
    }
}

impl Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardStatus::Active => write!(f, "active"),
            CardStatus::Frozen => write!(f, "frozen"),
            CardStatus::Terminated => write!(f, "terminated"),
        }
    }
}

impl FromStr for CardStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "frozen" => Ok(Self::Frozen),
            "terminated" => Ok(Self::Terminated),
            s => Err(ConversionError(format!("Invalid card status: {s}"))),
        }
    }
}

//--------------------------------------          Card         ---------------------------------------------------------
/// A card record as cached in the authorization path.
///
/// `daily_spent` and `monthly_spent` are a snapshot of the spending counters taken when the record was loaded. They
/// are informational only; the spending-limit stage always reads fresh totals from the store.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub user_id: String,
    pub status: CardStatus,
    pub daily_limit: Option<Amount>,
    pub monthly_limit: Option<Amount>,
    pub daily_spent: Amount,
    pub monthly_spent: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }
}

//--------------------------------------   SpendingControl     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SpendingControl {
    pub card_id: String,
    /// Overrides the card's daily limit when set to a positive value.
    pub daily_limit: Option<Amount>,
    /// Overrides the card's monthly limit when set to a positive value.
    pub monthly_limit: Option<Amount>,
    /// The merchant restriction set, as stored (JSON). Decoding is deferred to the merchant stage so that a corrupt
    /// record produces a `MERCHANT_CHECK_ERROR` denial there instead of failing the whole authorization.
    pub merchant_restrictions: Option<String>,
}

impl SpendingControl {
    pub fn merchant_restrictions(&self) -> Result<MerchantRestrictions, serde_json::Error> {
        match self.merchant_restrictions.as_deref().map(str::trim) {
            None | Some("") => Ok(MerchantRestrictions::default()),
            Some(json) => serde_json::from_str(json),
        }
    }

    pub fn with_restrictions(mut self, restrictions: &MerchantRestrictions) -> Self {
        self.merchant_restrictions = serde_json::to_string(restrictions).ok();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantRestrictions {
    #[serde(default)]
    pub blocked_merchants: Vec<String>,
    #[serde(default)]
    pub blocked_categories: Vec<String>,
    /// When non-empty, only these merchants pass.
    #[serde(default)]
    pub allowed_merchants: Vec<String>,
}

//--------------------------------------    SpendingTotals     ---------------------------------------------------------
/// Approved spend for one card in the current day and month buckets, as recorded in the spending counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SpendingTotals {
    pub daily: Amount,
    pub monthly: Amount,
}

//--------------------------------------     Transaction       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub token: String,
    pub card_id: String,
    pub user_id: String,
    pub amount: Amount,
    pub currency: String,
    pub merchant_name: Option<String>,
    pub merchant_category: Option<String>,
    pub status: String,
    pub transaction_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub token: String,
    pub card_id: String,
    pub user_id: String,
    pub amount: Amount,
    pub currency: String,
    pub merchant_name: Option<String>,
    pub merchant_category: Option<String>,
    pub status: String,
    pub transaction_type: String,
    pub created_at: Option<DateTime<Utc>>,
}

//--------------------------------------    ExecutionTrace     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

/// One stage transition in an authorization attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub stage: AuthorizationStage,
    pub status: StepStatus,
    pub timestamp: DateTime<Utc>,
    /// Time spent in this stage, in microseconds.
    pub elapsed_us: u64,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExecutionTrace {
    pub event_token: String,
    pub card_id: String,
    pub steps: Vec<TraceStep>,
    pub approved: bool,
    pub final_decision: DecisionReason,
    pub total_latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub id: i64,
    pub event_token: String,
    pub card_id: String,
    pub steps: Vec<TraceStep>,
    pub approved: bool,
    pub final_decision: DecisionReason,
    pub total_latency_ms: f64,
    pub created_at: DateTime<Utc>,
}
