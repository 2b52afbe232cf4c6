//! # Durable store contracts
//!
//! This module defines the interface contracts that the JIT funding engine's durable store *backends* must fulfil.
//! The store is the source of truth for users, cards, spending controls, wallet balances, spending counters,
//! transactions and execution traces. The cache layer is derived from it.
//!
//! * [`AuthorizationDatabase`] provides the reads the authorization pipeline depends on, and the atomic spending
//!   counter upsert that runs on approval.
//! * [`TraceManagement`] is the append-only sink for execution traces, and the queries used to inspect them.
//! * [`NetworkEventManagement`] records the side effects of asynchronous card-network events (clearing, settlement and
//!   card state changes).
//!
//! Trait methods return the backend-agnostic [`StoreError`] so that the APIs (and mocks of these traits) don't need to
//! know which backend they are driving.
mod authorization_database;
mod data_objects;
mod errors;
mod network_event_management;
mod trace_management;

pub use authorization_database::AuthorizationDatabase;
pub use data_objects::{day_bucket, month_bucket, InsertTransactionResult};
pub use errors::StoreError;
pub use network_event_management::NetworkEventManagement;
pub use trace_management::TraceManagement;
