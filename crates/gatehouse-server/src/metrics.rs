//! Prometheus metrics recorder and `/metrics` rendering.

pub use gatehouse_core::metric_names::{
    BUS_EVICTIONS_TOTAL, CHAT_INVOCATIONS_TOTAL, OBSERVER_CONNECTIONS_ACTIVE,
    PERMISSION_REQUESTS_PENDING, PERMISSION_REQUESTS_TOTAL, PERMISSION_RESOLUTIONS_TOTAL,
    SESSIONS_CREATED_TOTAL,
};

pub use metrics_exporter_prometheus::PrometheusHandle;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Call once at startup, before anything records a metric.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}
