//! # gatehouse-proxy
//!
//! Tool permission proxy launched by the agent runtime. It speaks
//! line-delimited JSON-RPC on stdio and exposes one tool,
//! `permission_prompt`, which forwards each prompt to the gatehouse broker
//! and blocks until a human decides.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`translate`] | Prompt arguments to broker submission |
//! | [`client`] | Broker HTTP client |
//! | [`rewrite`] | Redirect temp paths into the session workspace |
//! | [`prompt`] | Fail-closed decision pipeline |
//! | [`protocol`] | JSON-RPC message types |
//! | [`server`] | Stdio request loop |

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod prompt;
pub mod protocol;
pub mod rewrite;
pub mod server;
pub mod translate;

pub use client::BrokerClient;
pub use errors::ProxyError;
pub use prompt::PermissionPrompt;
pub use server::ProxyServer;
