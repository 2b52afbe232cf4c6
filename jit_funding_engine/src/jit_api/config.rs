use std::{fmt::Display, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::db_types::ConversionError;

pub const DEFAULT_DECISION_BUDGET: Duration = Duration::from_millis(100);

/// How the daily limit is enforced when approvals for the same card race each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitEnforcement {
    /// The limit is checked against the counters read at the spending-limit stage. Concurrent approvals for one card
    /// can overshoot the daily limit by at most the sum of the in-flight amounts.
    #[default]
    Soft,
    /// The counter increment itself is conditional on staying within the daily limit, so the recorded daily spend
    /// never exceeds it. An attempt that loses the race is denied at the counter-update stage.
    Strict,
}

impl Display for LimitEnforcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for LimitEnforcement {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(Self::Soft),
            "strict" => Ok(Self::Strict),
            _ => Err(ConversionError(format!("Invalid limit enforcement mode: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitConfig {
    /// Decisions slower than this are logged as warnings. Work is never cut short.
    pub decision_budget: Duration,
    pub limit_enforcement: LimitEnforcement,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self { decision_budget: DEFAULT_DECISION_BUDGET, limit_enforcement: LimitEnforcement::default() }
    }
}

impl JitConfig {
    pub fn with_limit_enforcement(mut self, mode: LimitEnforcement) -> Self {
        self.limit_enforcement = mode;
        self
    }

    pub fn with_decision_budget(mut self, budget: Duration) -> Self {
        self.decision_budget = budget;
        self
    }
}
