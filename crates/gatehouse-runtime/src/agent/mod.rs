//! Agent invocation: per-call configuration, normalization, and runtimes.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `adapter` | Drives one invocation, emits [`gatehouse_core::ChatEvent`]s, binds agent session IDs |
//! | `call` | `AgentCall` and the `AgentRuntime` trait |
//! | `command` | Subprocess runtime speaking line-delimited JSON |
//! | `normalize` | Raw turn event → text / session-bound classification, text joining |

pub mod adapter;
pub mod call;
pub mod command;
pub mod normalize;

pub use adapter::{AdapterConfig, AgentInvocationAdapter, ChatOutcome, ChatStream};
pub use call::{AgentCall, AgentRuntime, PermissionCallbackTarget, TurnStream};
pub use command::CommandRuntime;
pub use normalize::{TurnEvent, join_text, normalize};
