//! Background Schedulers
//!
//! ## Sync Scheduler
//! Runs a sync cycle on a fixed interval, starting immediately.
//!
//! Features:
//! - Configurable interval (`IP_CHECK_INTERVAL`, default 60 minutes)
//! - Never overlaps cycles: a tick that fires while a cycle is running is skipped, not queued
//! - Slack notification on applied changes and on the first failure of a streak
//! - On shutdown, waits up to `SHUTDOWN_GRACE` for the in-flight cycle
//!
//! ## Metrics Scheduler
//! Pushes the current sync snapshot to the metrics backend on its own interval
//! (`METRICS_INTERVAL`, default 60 seconds), decoupled from the sync cadence.

mod metrics;
mod sync;

pub use self::metrics::start_metrics;
pub use sync::{start_sync, LoopStats};
