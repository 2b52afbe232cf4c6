//! # JIT funding engine public API
//!
//! The `jit_api` module exposes the programmatic API of the engine.
//!
//! * [`jit_funding_api`] is the authorization orchestrator. It runs the rule pipeline for an authorization request and
//!   always returns a decision.
//! * [`fallback`] defines the [`Authorizer`](fallback::Authorizer) seam, and a strategy that delegates decisions to a
//!   remote authority with a bounded timeout and falls back to the local orchestrator.
//! * [`network_event_api`] records clearing and settlement events and applies card state changes.
//! * [`evaluators`] holds the individual rules, as pure functions.
//!
//! The other submodules are support types.
//!
//! # API usage
//!
//! An API instance is created by supplying a store backend that implements the traits the API needs, and a cache.
//!
//! ```rust,ignore
//! use jit_funding_engine::{cache::{MemoryCache, ReadThroughCache}, JitConfig, JitFundingApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/jit_store.db", 25).await?;
//! let cache = ReadThroughCache::new(MemoryCache::default());
//! let api = JitFundingApi::new(db, cache, JitConfig::default(), EventProducers::default());
//! let decision = api.authorize(AuthorizationRequest::new("card-1", "12.50".parse()?)).await;
//! ```
pub mod authorization_objects;
pub mod config;
pub mod errors;
pub mod evaluators;
pub mod fallback;
pub mod jit_funding_api;
pub mod network_event_api;
pub mod network_objects;
pub mod trace_recorder;

/// A fresh event token, for authorization requests that arrive without one.
pub fn new_event_token() -> String {
    format!("jit_{:016x}", rand::random::<u64>())
}
