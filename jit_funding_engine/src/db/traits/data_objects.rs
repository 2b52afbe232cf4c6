use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTransactionResult {
    Inserted(i64),
    AlreadyExists(i64),
}

/// The spending-counter day bucket (`YYYY-MM-DD`, UTC) for the given time.
pub fn day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// The spending-counter month bucket (`YYYY-MM`, UTC) for the given time.
pub fn month_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}
