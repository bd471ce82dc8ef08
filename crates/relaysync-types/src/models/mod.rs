//! Core domain models for relaysync.

mod config;
mod metric;
mod range_set;
mod state;

pub use config::{
    MetricsConfig, NotifyConfig, SyncConfig, DEFAULT_ACCESS_FILE, DEFAULT_DIRECTION_FILTER,
    DEFAULT_POSTFIX_CONFIG_DIR, DEFAULT_PRODUCT_FILTER, DEFAULT_UPSTREAM_URL, FILTER_ANY,
};
pub use metric::MetricSample;
pub use range_set::{IpRangeSet, RangeDiff};
pub use state::SyncState;
