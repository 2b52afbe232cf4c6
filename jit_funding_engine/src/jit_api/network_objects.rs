//! Data contracts for events delivered by the card network.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use jit_common::{Amount, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};

use crate::{db_types::NewTransaction, jit_api::authorization_objects::AuthorizationRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEventKind {
    Authorization,
    Clearing,
    Settlement,
    CardStateChange,
    Unsupported(String),
}

impl From<&str> for NetworkEventKind {
    fn from(value: &str) -> Self {
        match value {
            "transaction.authorization" | "jit.funding.paymentcontrol" => Self::Authorization,
            "transaction.clearing" => Self::Clearing,
            "transaction.settlement" => Self::Settlement,
            "cardstatechange" | "card.statechange" => Self::CardStateChange,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// The envelope of every webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub transaction: Option<NetworkTransaction>,
    #[serde(default)]
    pub card: Option<NetworkCardState>,
}

impl NetworkEvent {
    pub fn kind(&self) -> NetworkEventKind {
        NetworkEventKind::from(self.event_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTransaction {
    pub token: String,
    pub card_token: String,
    #[serde(default)]
    pub user_token: Option<String>,
    /// In minor units
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency_code: String,
    #[serde(default)]
    pub merchant: Option<NetworkMerchant>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY_CODE.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMerchant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mcc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCardState {
    pub card_token: String,
    pub state: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NetworkTransaction {
    pub fn amount(&self) -> Amount {
        Amount::from_minor_units(self.amount)
    }

    pub fn merchant_name(&self) -> Option<&str> {
        self.merchant.as_ref().and_then(|m| m.name.as_deref())
    }

    pub fn merchant_category(&self) -> Option<&str> {
        self.merchant.as_ref().and_then(|m| m.mcc.as_deref())
    }

    pub fn to_authorization_request(&self) -> AuthorizationRequest {
        AuthorizationRequest {
            event_token: Some(self.token.clone()),
            card_id: self.card_token.clone(),
            user_id: self.user_token.clone(),
            amount: self.amount(),
            currency: self.currency_code.clone(),
            merchant_name: self.merchant_name().map(String::from),
            merchant_category: self.merchant_category().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearingKind {
    Clearing,
    Settlement,
}

impl Display for ClearingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clearing => write!(f, "clearing"),
            Self::Settlement => write!(f, "settlement"),
        }
    }
}

/// A clearing or settlement event waiting to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearingJob {
    pub kind: ClearingKind,
    pub transaction: NetworkTransaction,
}

impl ClearingJob {
    pub fn new(kind: ClearingKind, transaction: NetworkTransaction) -> Self {
        Self { kind, transaction }
    }

    /// The transaction row for this event, owned by `user_id`.
    pub fn to_new_transaction(&self, user_id: String) -> NewTransaction {
        let tx = &self.transaction;
        let default_status = match self.kind {
            ClearingKind::Clearing => "CLEARED",
            ClearingKind::Settlement => "SETTLED",
        };
        NewTransaction {
            token: tx.token.clone(),
            card_id: tx.card_token.clone(),
            user_id,
            amount: tx.amount(),
            currency: tx.currency_code.clone(),
            merchant_name: tx.merchant_name().map(String::from),
            merchant_category: tx.merchant_category().map(String::from),
            status: tx.state.clone().unwrap_or_else(|| default_status.to_string()),
            transaction_type: self.kind.to_string(),
            created_at: tx.created_time,
        }
    }
}
