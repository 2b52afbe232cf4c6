use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use jit_common::{Amount, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};

use crate::db_types::ConversionError;

//--------------------------------------  AuthorizationRequest  --------------------------------------------------------
/// A single authorization attempt, as normalized from a card-network event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// The network's event token. One is generated if the caller doesn't supply it.
    #[serde(default)]
    pub event_token: Option<String>,
    pub card_id: String,
    /// Informational. The card's owner on record is the user that is checked.
    #[serde(default)]
    pub user_id: Option<String>,
    pub amount: Amount,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub merchant_category: Option<String>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY_CODE.to_string()
}

impl AuthorizationRequest {
    pub fn new<S: Into<String>>(card_id: S, amount: Amount) -> Self {
        Self {
            event_token: None,
            card_id: card_id.into(),
            user_id: None,
            amount,
            currency: default_currency(),
            merchant_name: None,
            merchant_category: None,
        }
    }

    pub fn with_event_token<S: Into<String>>(mut self, token: S) -> Self {
        self.event_token = Some(token.into());
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_merchant<S: Into<String>>(mut self, name: S, category: Option<S>) -> Self {
        self.merchant_name = Some(name.into());
        self.merchant_category = category.map(Into::into);
        self
    }
}

//--------------------------------------        Decision        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub approved: bool,
    pub reason: DecisionReason,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
}

impl Decision {
    pub fn new(reason: DecisionReason, timestamp: DateTime<Utc>, processing_time_ms: u64) -> Self {
        Self { approved: reason.is_approval(), reason, timestamp, processing_time_ms }
    }

    pub fn system_error() -> Self {
        Self::new(DecisionReason::SystemError, Utc::now(), 0)
    }
}

//--------------------------------------     DecisionReason     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    Approved,
    InvalidAmount,
    CardNotFound,
    CardInactive,
    UserNotFound,
    DailyLimitExceeded,
    MonthlyLimitExceeded,
    MerchantBlocked,
    CategoryBlocked,
    MerchantNotAllowed,
    CurrencyWalletNotFound,
    InsufficientFunds,
    LimitCheckError,
    MerchantCheckError,
    BalanceCheckError,
    SystemError,
}

/// The broad class a [`DecisionReason`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonKind {
    Approved,
    /// A record the decision depends on does not exist. Terminal.
    NotFound,
    /// The transaction violates a rule. Terminal.
    Policy,
    /// The decision could not be evaluated and was declined conservatively.
    System,
}

impl DecisionReason {
    pub fn kind(&self) -> ReasonKind {
        use DecisionReason::*;
        match self {
            Approved => ReasonKind::Approved,
            CardNotFound | UserNotFound | CurrencyWalletNotFound => ReasonKind::NotFound,
            InvalidAmount | CardInactive | DailyLimitExceeded | MonthlyLimitExceeded | MerchantBlocked | CategoryBlocked |
            MerchantNotAllowed | InsufficientFunds => ReasonKind::Policy,
            LimitCheckError | MerchantCheckError | BalanceCheckError | SystemError => ReasonKind::System,
        }
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, DecisionReason::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        use DecisionReason::*;
        match self {
            Approved => "APPROVED",
            InvalidAmount => "INVALID_AMOUNT",
            CardNotFound => "CARD_NOT_FOUND",
            CardInactive => "CARD_INACTIVE",
            UserNotFound => "USER_NOT_FOUND",
            DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            MonthlyLimitExceeded => "MONTHLY_LIMIT_EXCEEDED",
            MerchantBlocked => "MERCHANT_BLOCKED",
            CategoryBlocked => "CATEGORY_BLOCKED",
            MerchantNotAllowed => "MERCHANT_NOT_ALLOWED",
            CurrencyWalletNotFound => "CURRENCY_WALLET_NOT_FOUND",
            InsufficientFunds => "INSUFFICIENT_FUNDS",
            LimitCheckError => "LIMIT_CHECK_ERROR",
            MerchantCheckError => "MERCHANT_CHECK_ERROR",
            BalanceCheckError => "BALANCE_CHECK_ERROR",
            SystemError => "SYSTEM_ERROR",
        }
    }
}

impl Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionReason {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use DecisionReason::*;
        [
            Approved,
            InvalidAmount,
            CardNotFound,
            CardInactive,
            UserNotFound,
            DailyLimitExceeded,
            MonthlyLimitExceeded,
            MerchantBlocked,
            CategoryBlocked,
            MerchantNotAllowed,
            CurrencyWalletNotFound,
            InsufficientFunds,
            LimitCheckError,
            MerchantCheckError,
            BalanceCheckError,
            SystemError,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
        .ok_or_else(|| ConversionError(format!("Invalid decision reason: {s}")))
    }
}

//--------------------------------------   AuthorizationStage   --------------------------------------------------------
/// The states of the authorization state machine, in evaluation order. `Denied` and `SystemError` can follow any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStage {
    Start,
    CardLookup,
    CardStatus,
    UserLookup,
    SpendingLimits,
    MerchantControls,
    BalanceCheck,
    CounterUpdate,
    Approved,
    Denied,
    SystemError,
}

impl AuthorizationStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Denied | Self::SystemError)
    }
}

impl Display for AuthorizationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "START",
            Self::CardLookup => "CARD_LOOKUP",
            Self::CardStatus => "CARD_STATUS",
            Self::UserLookup => "USER_LOOKUP",
            Self::SpendingLimits => "SPENDING_LIMITS",
            Self::MerchantControls => "MERCHANT_CONTROLS",
            Self::BalanceCheck => "BALANCE_CHECK",
            Self::CounterUpdate => "COUNTER_UPDATE",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::SystemError => "SYSTEM_ERROR",
        };
        f.write_str(s)
    }
}
