//! Metrics collection for marketplace-service.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics recorder already initialized");
    }
    Ok(())
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_checkout(status: &'static str) {
    metrics::counter!("checkout_sessions_total", "status" => status).increment(1);
}

pub fn record_wallet_posting(kind: &'static str) {
    metrics::counter!("wallet_postings_total", "kind" => kind).increment(1);
}

pub fn record_booking_transition(status: &'static str) {
    metrics::counter!("booking_status_transitions_total", "status" => status).increment(1);
}
