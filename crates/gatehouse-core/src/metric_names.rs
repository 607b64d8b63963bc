//! Metric names recorded across the workspace.

/// Permission requests submitted (counter).
pub const PERMISSION_REQUESTS_TOTAL: &str = "permission_requests_total";
/// Permission requests settled (counter, labels: outcome).
pub const PERMISSION_RESOLUTIONS_TOTAL: &str = "permission_resolutions_total";
/// Requests awaiting a decision (gauge).
pub const PERMISSION_REQUESTS_PENDING: &str = "permission_requests_pending";
/// Connected permission observers (gauge).
pub const OBSERVER_CONNECTIONS_ACTIVE: &str = "observer_connections_active";
/// Subscribers evicted from the event bus (counter).
pub const BUS_EVICTIONS_TOTAL: &str = "bus_evictions_total";
/// Agent invocations finished (counter, labels: status).
pub const CHAT_INVOCATIONS_TOTAL: &str = "chat_invocations_total";
/// Session workspaces created (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "sessions_created_total";

/// Every name above, for exporters and tests.
pub const ALL: [&str; 7] = [
    PERMISSION_REQUESTS_TOTAL,
    PERMISSION_RESOLUTIONS_TOTAL,
    PERMISSION_REQUESTS_PENDING,
    OBSERVER_CONNECTIONS_ACTIVE,
    BUS_EVICTIONS_TOTAL,
    CHAT_INVOCATIONS_TOTAL,
    SESSIONS_CREATED_TOTAL,
];
