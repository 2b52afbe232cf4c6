use crate::{
    db::traits::StoreError,
    db_types::{ExecutionTrace, NewExecutionTrace},
};

/// The execution trace sink. Traces are append-only: backends must reject updates and deletes.
#[allow(async_fn_in_trait)]
pub trait TraceManagement {
    /// Appends a trace and returns its id.
    async fn insert_trace(&self, trace: NewExecutionTrace) -> Result<i64, StoreError>;

    /// The most recent trace recorded for the given network event token.
    async fn fetch_latest_trace(&self, event_token: &str) -> Result<Option<ExecutionTrace>, StoreError>;

    /// All traces recorded for the given event token, oldest first.
    async fn fetch_traces_for_event(&self, event_token: &str) -> Result<Vec<ExecutionTrace>, StoreError>;

    /// The `limit` most recent traces for the card, latest first.
    async fn fetch_traces_for_card(&self, card_id: &str, limit: u32) -> Result<Vec<ExecutionTrace>, StoreError>;
}
