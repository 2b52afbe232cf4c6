//! JIT Funding Engine
//!
//! The JIT funding engine approves or declines card-network authorization requests in real time, within a strict
//! latency budget. It is provider-agnostic: the card network's events arrive through the data contracts in
//! [`jit_api::network_objects`], and decisions are returned as plain values.
//!
//! The library is divided into these sections:
//! 1. Durable store management ([`mod@db`]). The store traits define what a backend must provide; SQLite is the
//!    supported backend. You should never need to access the database directly. The exception is the data types used
//!    in the database, which are defined in the `db_types` module and are public.
//! 2. The cache layer ([`mod@cache`]), a best-effort read-through cache for card and user records.
//! 3. The engine's public API ([`mod@jit_api`]): the authorization orchestrator, its rule evaluators, the fallback
//!    strategy for delegated decisions, and the handling of asynchronous network events.
//! 4. A retrying job queue with dead-lettering ([`mod@queue`]) used to process clearing and settlement events off the
//!    request path.
//!
//! The engine also emits events that can be subscribed to, for example after every authorization decision. A simple
//! actor framework in [`mod@events`] lets you hook into these and run custom actions without slowing decisions down.
pub mod cache;
mod db;
pub mod db_types;
pub mod events;
pub mod jit_api;
pub mod queue;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{
    day_bucket,
    month_bucket,
    AuthorizationDatabase,
    InsertTransactionResult,
    NetworkEventManagement,
    StoreError,
    TraceManagement,
};
pub use jit_api::{
    authorization_objects::{AuthorizationRequest, AuthorizationStage, Decision, DecisionReason, ReasonKind},
    config::{JitConfig, LimitEnforcement},
    errors::{JitError, NetworkEventError, RemoteAuthorityError},
    fallback::{Authorizer, FallbackAuthorizer, RemoteAuthority},
    jit_funding_api::JitFundingApi,
    network_event_api::NetworkEventApi,
};
