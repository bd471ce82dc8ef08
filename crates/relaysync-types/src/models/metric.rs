//! Metric samples destined for the push backend.

use serde::{Deserialize, Serialize};

/// A point-in-time gauge value tagged with the emitting host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSample {
    /// Fully qualified metric name, e.g. `relaysync.upstream_range_count`
    pub name: String,
    pub value: f64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub host: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MetricSample {
    pub fn gauge(name: impl Into<String>, value: f64, host: &str, timestamp: i64) -> Self {
        Self { name: name.into(), value, timestamp, host: host.to_string(), tags: Vec::new() }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
