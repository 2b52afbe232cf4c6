//! # JIT funding server
//! This crate hosts the HTTP front end of the JIT funding engine. It is responsible for:
//! * Receiving signed webhook deliveries from the card network and verifying their HMAC signatures.
//! * Answering authorization events synchronously with an approve/decline decision.
//! * Handing clearing and settlement events to a background worker that records them with retries.
//! * Applying card lifecycle changes reported by the network.
//! * Exposing the orchestrator and the execution traces to trusted callers behind an admin API key.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /webhooks/network`: The card network's webhook. Requires a valid signature.
//! * `POST /api/authorize`: Decide an authorization request. Used by peers that delegate decisions to this server.
//! * `GET /api/traces/{event_token}`: The latest execution trace recorded for an event.
//! * `GET /api/cards/{card_id}/traces`: The most recent execution traces for a card.
//!
//! All `/api` routes require the `x-admin-key` header.

pub mod cli;
pub mod config;
pub mod errors;

pub mod clearing_worker;
pub mod data_objects;
pub mod helpers;
pub mod middleware;
pub mod remote_authority;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
