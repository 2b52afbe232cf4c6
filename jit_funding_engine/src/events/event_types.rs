use jit_common::Amount;
use serde::{Deserialize, Serialize};

use crate::{db_types::CardStatus, jit_api::authorization_objects::Decision};

/// Published after every authorization attempt, approved or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecidedEvent {
    pub event_token: String,
    pub card_id: String,
    pub amount: Amount,
    pub currency: String,
    pub decision: Decision,
}

/// Published when a clearing or settlement record is stored for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecordedEvent {
    pub token: String,
    pub card_id: String,
    pub amount: Amount,
    pub transaction_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStatusChangedEvent {
    pub card_id: String,
    pub status: CardStatus,
}
