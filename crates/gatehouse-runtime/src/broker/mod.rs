//! Broker modules: human-in-the-loop permission requests.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `broker` | Submit/resolve/list, deadline handling, atomic snapshot + subscribe |
//! | `bus` | Per-subscriber bounded queues, slow-subscriber eviction |
//! | `registry` | Pending requests keyed by ID, exactly-once removal |
//!
//! ## Lock Order
//!
//! The broker publishes while holding the registry lock, so observers see
//! events in the same order the registry changes. Always take the registry
//! lock before the bus lock, never the reverse.

#[allow(clippy::module_inception)]
pub mod broker;
pub mod bus;
pub mod registry;

pub use broker::{DEFAULT_REQUEST_TIMEOUT, PermissionBroker};
pub use bus::{EventBus, Subscription};
pub use registry::{CorrelationRegistry, PendingPermission};
