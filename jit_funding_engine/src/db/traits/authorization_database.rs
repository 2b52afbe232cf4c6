use jit_common::Amount;

use crate::{
    db::traits::StoreError,
    db_types::{Card, SpendingControl, SpendingTotals, User},
};

/// The reads and writes the authorization pipeline makes against the durable store.
///
/// Every method is a single await point. Implementations must not hold locks across calls, and must make
/// [`increment_spending_counter`](AuthorizationDatabase::increment_spending_counter) atomic at the storage layer.
#[allow(async_fn_in_trait)]
pub trait AuthorizationDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches the card with the given id, along with a snapshot of its spending counters for the current UTC day and
    /// month.
    async fn fetch_card(&self, card_id: &str) -> Result<Option<Card>, StoreError>;

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Fetches the spending control record for the card. `None` means the card has no controls, which is not a denial.
    async fn fetch_spending_control(&self, card_id: &str) -> Result<Option<SpendingControl>, StoreError>;

    /// Returns the approved spend recorded against the card in the given day (`YYYY-MM-DD`) and month (`YYYY-MM`)
    /// buckets. Missing counters are zero.
    async fn fetch_spending_totals(&self, card_id: &str, day: &str, month: &str) -> Result<SpendingTotals, StoreError>;

    /// Fetches the user's wallet balance in the given currency. `None` means the user has no wallet in that currency.
    async fn fetch_wallet_balance(&self, user_id: &str, currency: &str) -> Result<Option<Amount>, StoreError>;

    /// Atomically adds `amount` to the card's counter for `day`, creating the counter if it does not exist.
    ///
    /// If `ceiling` is given, the increment only happens when the resulting total would not exceed it. The new total
    /// is returned, or `None` if the ceiling rejected the increment.
    async fn increment_spending_counter(
        &self,
        card_id: &str,
        day: &str,
        amount: Amount,
        ceiling: Option<Amount>,
    ) -> Result<Option<Amount>, StoreError>;
}
