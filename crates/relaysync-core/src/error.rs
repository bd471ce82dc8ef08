//! Operational error type for relaysync core.

use relaysync_types::SyncErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Upstream request failed (connect, TLS, timeout, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("Upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    /// Upstream body exceeded the size limit.
    #[error("Upstream document exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Document was not valid JSON or did not match the expected schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document parsed but its content is unusable.
    #[error("Malformed document: {0}")]
    Document(String),

    /// Access file could not be written or replaced.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A Postfix control command failed, hung or could not be spawned.
    #[error("Reload failed: {0}")]
    Reload(String),

    /// Metrics backend push failed.
    #[error("Metrics delivery failed: {0}")]
    MetricsDelivery(String),

    /// Slack webhook failed.
    #[error("Notification failed: {0}")]
    Notify(String),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Classification reported in `SyncState.lastError`.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Network(_) | Self::UpstreamStatus { .. } | Self::TooLarge { .. } => {
                SyncErrorKind::Fetch
            },
            Self::Json(_) | Self::Document(_) => SyncErrorKind::Parse,
            Self::Io { .. } => SyncErrorKind::Write,
            Self::Reload(_) => SyncErrorKind::Reload,
            Self::MetricsDelivery(_) | Self::Notify(_) => SyncErrorKind::MetricsDelivery,
        }
    }
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
