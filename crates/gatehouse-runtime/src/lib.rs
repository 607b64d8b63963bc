//! # gatehouse-runtime
//!
//! The coordination core: everything between the agent runtime, the tool
//! permission proxy, and the humans watching in a browser.
//!
//! - **Broker**: [`broker::PermissionBroker`] parks a submitter until a human
//!   answers or the deadline denies; [`broker::EventBus`] fans broker events
//!   out to observers with per-subscriber bounded queues
//! - **Workspaces**: [`workspace::SessionWorkspaceManager`] binds session IDs
//!   to isolated directories
//! - **Agent**: [`agent::AgentInvocationAdapter`] runs one invocation against
//!   an [`agent::AgentRuntime`] and normalizes its output
//!
//! ## Crate Position
//!
//! Depends on: gatehouse-core.
//! Depended on by: gatehouse-server, gatehouse-agent.

#![deny(unsafe_code)]

pub mod agent;
pub mod broker;
pub mod errors;
pub mod workspace;

pub use errors::{AgentError, BrokerError, WorkspaceError};
