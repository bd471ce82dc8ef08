//! Application State
//!
//! Everything the HTTP handlers read. Handlers only ever see snapshots, so a
//! request can never block on or trigger a sync cycle. `/postfix` may run the
//! read-only agent checks, which are bounded by the control command timeout.

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use relaysync_core::{AccessFile, PostfixAgent, StatusHandle};
use relaysync_types::SyncState;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub status: StatusHandle,
    pub access_file: AccessFile,
    pub agent: PostfixAgent,
    pub upstream_url: String,
    pub sync_interval_secs: u64,
    pub prometheus: PrometheusHandle,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        status: StatusHandle,
        access_file: AccessFile,
        agent: PostfixAgent,
        upstream_url: impl Into<String>,
        sync_interval_secs: u64,
        prometheus: PrometheusHandle,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                status,
                access_file,
                agent,
                upstream_url: upstream_url.into(),
                sync_interval_secs,
                prometheus,
                started_at: Utc::now(),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<SyncState> {
        self.inner.status.snapshot()
    }

    pub fn access_file(&self) -> &AccessFile {
        &self.inner.access_file
    }

    pub fn agent(&self) -> &PostfixAgent {
        &self.inner.agent
    }
}
