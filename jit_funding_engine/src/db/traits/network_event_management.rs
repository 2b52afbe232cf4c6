use crate::{
    db::traits::{InsertTransactionResult, StoreError},
    db_types::{CardStatus, NewTransaction, Transaction},
};

/// Persistence for the asynchronous side of the card network: clearing and settlement records, and card lifecycle
/// changes.
#[allow(async_fn_in_trait)]
pub trait NetworkEventManagement {
    /// Returns the id of the user that owns the card, or `None` if the card is unknown.
    async fn fetch_card_owner(&self, card_id: &str) -> Result<Option<String>, StoreError>;

    /// Records the transaction. Recording is idempotent on the network token: a second delivery of the same token
    /// returns [`InsertTransactionResult::AlreadyExists`] and changes nothing.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertTransactionResult, StoreError>;

    async fn fetch_transaction(&self, token: &str) -> Result<Option<Transaction>, StoreError>;

    /// Sets the card's lifecycle status. Returns `false` if the card does not exist.
    async fn update_card_status(&self, card_id: &str, status: CardStatus) -> Result<bool, StoreError>;
}
