//! Prometheus mirror of the pushed metrics.
//!
//! Exposes, in Prometheus/OpenMetrics text format:
//! - `relaysync_upstream_range_count` - Gauge of applied upstream ranges
//! - `relaysync_reload_success` - Gauge, 1 if the most recent reload succeeded
//! - `relaysync_consecutive_failures` - Gauge of failed cycles in a row
//! - `relaysync_sync_age_seconds` - Gauge of seconds since the last good sync
//! - `relaysync_sync_cycles_total{outcome}` - Counter of cycles by outcome

use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
///
/// Safe to call more than once; later calls return the first handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_gauge!("relaysync_upstream_range_count", "Upstream ranges in the applied access file");
    describe_gauge!("relaysync_reload_success", "1 if the most recent Postfix reload succeeded");
    describe_gauge!("relaysync_consecutive_failures", "Sync cycles failed in a row");
    describe_gauge!("relaysync_sync_age_seconds", "Seconds since the last successful sync");
    describe_counter!("relaysync_sync_cycles_total", "Sync cycles by outcome");

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// A handle that renders without a global recorder installed (tests, fallback).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Set the gauges. Calls are no-ops until a recorder is installed.
pub fn record_gauges(range_count: f64, reload_success: f64, failures: f64, age: Option<f64>) {
    gauge!("relaysync_upstream_range_count").set(range_count);
    gauge!("relaysync_reload_success").set(reload_success);
    gauge!("relaysync_consecutive_failures").set(failures);
    if let Some(age) = age {
        gauge!("relaysync_sync_age_seconds").set(age);
    }
}
