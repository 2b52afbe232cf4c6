use jit_funding_engine::{
    db_types::{CardStatus, ExecutionTrace, NewExecutionTrace, NewTransaction, Transaction},
    AuthorizationRequest,
    Authorizer,
    Decision,
    InsertTransactionResult,
    NetworkEventManagement,
    StoreError,
    TraceManagement,
};
use mockall::mock;

mock! {
    pub Decider {}
    impl Authorizer for Decider {
        async fn authorize(&self, request: AuthorizationRequest) -> Decision;
    }
}

mock! {
    pub NetworkStore {}
    impl NetworkEventManagement for NetworkStore {
        async fn fetch_card_owner(&self, card_id: &str) -> Result<Option<String>, StoreError>;
        async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertTransactionResult, StoreError>;
        async fn fetch_transaction(&self, token: &str) -> Result<Option<Transaction>, StoreError>;
        async fn update_card_status(&self, card_id: &str, status: CardStatus) -> Result<bool, StoreError>;
    }
}

mock! {
    pub TraceStore {}
    impl TraceManagement for TraceStore {
        async fn insert_trace(&self, trace: NewExecutionTrace) -> Result<i64, StoreError>;
        async fn fetch_latest_trace(&self, event_token: &str) -> Result<Option<ExecutionTrace>, StoreError>;
        async fn fetch_traces_for_event(&self, event_token: &str) -> Result<Vec<ExecutionTrace>, StoreError>;
        async fn fetch_traces_for_card(&self, card_id: &str, limit: u32) -> Result<Vec<ExecutionTrace>, StoreError>;
    }
}
