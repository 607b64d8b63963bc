//! # gatehouse-server
//!
//! Axum HTTP surface over the gatehouse runtime.
//!
//! - Permission endpoints: submit (blocking), list, respond
//! - Observer fan-out: `GET /api/permissions/stream` as Server-Sent Events,
//!   one bounded bus subscription per observer
//! - Session and chat endpoints over the agent invocation adapter
//! - Prometheus `/metrics` and `/health`
//! - Graceful shutdown via `CancellationToken`
//!
//! ## Crate Position
//!
//! Depends on: gatehouse-core, gatehouse-runtime.
//! Depended on by: gatehouse-agent.

#![deny(unsafe_code)]

pub mod errors;
pub mod fanout;
pub mod health;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use errors::ApiError;
pub use server::{AppState, GatehouseServer};
