//! Metrics emission.
//!
//! - [`MetricsEmitter`] turns the current [`SyncState`](relaysync_types::SyncState)
//!   into samples on its own schedule.
//! - [`MetricsSink`] is the push seam; [`DatadogSink`] is the production backend.
//! - [`prometheus`] mirrors the same values for the `/metrics` endpoint.

mod emitter;
pub mod prometheus;
mod sink;

pub use emitter::MetricsEmitter;
pub use sink::{DatadogSink, MetricsSink};
