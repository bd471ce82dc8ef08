//! Synchronization failure classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed sync step.
///
/// The serialized names are what `/status` reports as `lastError.kind`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SyncErrorKind {
    /// Network failure, timeout or non-2xx response from the upstream
    #[serde(rename = "FetchError")]
    Fetch,
    /// Upstream document was malformed or yielded no usable ranges
    #[serde(rename = "ParseError")]
    Parse,
    /// The access file could not be written
    #[serde(rename = "WriteError")]
    Write,
    /// The mail agent did not accept the reload
    #[serde(rename = "ReloadError")]
    Reload,
    /// Metrics backend rejected or never received a push (never stored in state)
    #[serde(rename = "MetricsDeliveryError")]
    MetricsDelivery,
}

impl SyncErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "FetchError",
            Self::Parse => "ParseError",
            Self::Write => "WriteError",
            Self::Reload => "ReloadError",
            Self::MetricsDelivery => "MetricsDeliveryError",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last error recorded by the synchronizer.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct SyncFailure {
    /// Classification
    pub kind: SyncErrorKind,
    /// Human readable cause
    pub message: String,
    /// When the failure was recorded
    pub at: DateTime<Utc>,
}

impl SyncFailure {
    pub fn new(kind: SyncErrorKind, message: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { kind, message: message.into(), at }
    }
}
