//! # gatehouse-core
//!
//! Foundation types shared by every gatehouse crate.
//!
//! - **Permissions**: [`permission::PermissionRequest`], [`permission::PermissionResponse`],
//!   [`permission::PermissionDecision`] and the [`permission::ToolDecision`] returned to
//!   the agent runtime
//! - **Events**: [`events::BrokerEvent`] (bus payloads), [`events::ObserverFrame`]
//!   (what browser observers see), [`events::ChatEvent`] (normalized agent output)
//! - **IDs**: prefixed, time-ordered identifiers in [`ids`]
//! - **Logging**: [`logging::init_subscriber`]
//! - **Metrics**: shared metric names in [`metric_names`]
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other gatehouse crates.

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod metric_names;
pub mod permission;

pub use events::{BrokerEvent, ChatEvent, ObserverFrame};
pub use permission::{
    PermissionDecision, PermissionRequest, PermissionResponse, PermissionStatus,
    PermissionSubmission, ToolDecision,
};
