//! Range synchronizer.
//!
//! One cycle: fetch → parse → diff against the applied set → (write → reload).
//!
//! - Fetch/parse/write failures abort the cycle before Postfix is touched and
//!   leave the applied set as it was, so the next cycle retries.
//! - An unchanged set never writes the file or reloads. A set the access file
//!   already renders (e.g. after a restart) is adopted the same way.
//! - A reload failure is recorded but the written file is kept.

use async_trait::async_trait;
use chrono::Utc;
use relaysync_types::{IpRangeSet, SyncConfig, SyncErrorKind};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::access_file::AccessFile;
use crate::error::{CoreError, CoreResult};
use crate::reload::Reloader;
use crate::status::{StatusHandle, StatusPublisher};
use crate::upstream::{parse_document, RangeFilter, UpstreamClient};

/// Result of a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Upstream matched the applied set; nothing was written.
    Unchanged { ranges: usize },
    /// The access file was replaced and a reload attempted.
    Applied { ranges: usize, added: usize, removed: usize, reload_ok: bool },
    /// The cycle aborted before anything changed on disk.
    Failed { kind: SyncErrorKind, message: String },
}

impl CycleOutcome {
    /// Label used for the `outcome` metric dimension.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged { .. } => "unchanged",
            Self::Applied { reload_ok: true, .. } => "applied",
            Self::Applied { reload_ok: false, .. } => "reload_failed",
            Self::Failed { kind: SyncErrorKind::Fetch, .. } => "fetch_error",
            Self::Failed { kind: SyncErrorKind::Parse, .. } => "parse_error",
            Self::Failed { .. } => "write_error",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Applied { reload_ok: false, .. })
    }
}

/// Something the scheduler can run on every tick.
#[async_trait]
pub trait SyncCycle: Send + Sync {
    async fn run_cycle(&self) -> CycleOutcome;
}

/// Owns the mapping from upstream ranges to the Postfix access file.
pub struct Synchronizer {
    upstream: UpstreamClient,
    filter: RangeFilter,
    access_file: AccessFile,
    reloader: Arc<dyn Reloader>,
    status: StatusPublisher,
    cycle_lock: Mutex<()>,
}

impl Synchronizer {
    pub fn new(
        config: &SyncConfig,
        reloader: Arc<dyn Reloader>,
        status: StatusPublisher,
    ) -> CoreResult<Self> {
        let upstream = UpstreamClient::new(&config.upstream_url, config.fetch_timeout())?;
        let filter = RangeFilter::from_config(config);
        if filter.accepts_all() {
            tracing::warn!(
                "[Sync] No product/direction filter set, every upstream range will be allowed to relay"
            );
        }
        Ok(Self::from_parts(upstream, filter, AccessFile::from_config(config), reloader, status))
    }

    pub fn from_parts(
        upstream: UpstreamClient,
        filter: RangeFilter,
        access_file: AccessFile,
        reloader: Arc<dyn Reloader>,
        status: StatusPublisher,
    ) -> Self {
        Self { upstream, filter, access_file, reloader, status, cycle_lock: Mutex::new(()) }
    }

    /// A read-only view of the state this synchronizer publishes.
    pub fn status(&self) -> StatusHandle {
        self.status.subscribe()
    }

    pub fn access_file(&self) -> &AccessFile {
        &self.access_file
    }

    pub fn upstream_url(&self) -> &str {
        self.upstream.url()
    }

    async fn fetch_ranges(&self) -> CoreResult<IpRangeSet> {
        let body = self.upstream.fetch().await?;
        parse_document(&body, &self.filter)
    }

    /// True when the live file is exactly what `ranges` would render to.
    async fn on_disk(&self, ranges: &IpRangeSet) -> bool {
        match self.access_file.read().await {
            Ok(Some(content)) => content == self.access_file.render(ranges),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("[Sync] Could not read current access file, rewriting it: {}", e);
                false
            },
        }
    }

    fn record_failure(&self, err: &CoreError) -> CycleOutcome {
        let kind = err.kind();
        let message = err.to_string();
        let next = self.status.current().with_failure(kind, message.clone(), Utc::now());
        tracing::warn!(
            "[Sync] Cycle failed ({}), {} consecutive failure(s): {}",
            kind,
            next.consecutive_failures,
            message
        );
        self.status.publish(next);
        CycleOutcome::Failed { kind, message }
    }

    async fn cycle(&self) -> CycleOutcome {
        let ranges = match self.fetch_ranges().await {
            Ok(ranges) => ranges,
            Err(e) => return self.record_failure(&e),
        };

        let current = self.status.current();
        if current.is_applied(&ranges) {
            tracing::info!("[Sync] No changes detected ({} ranges)", ranges.len());
            self.status.publish(current.with_unchanged(Utc::now()));
            return CycleOutcome::Unchanged { ranges: ranges.len() };
        }

        if self.on_disk(&ranges).await {
            tracing::info!(
                "[Sync] {} already holds the current {} ranges, adopting it",
                self.access_file.path().display(),
                ranges.len()
            );
            let count = ranges.len();
            self.status.publish(current.with_adopted(ranges, Utc::now()));
            return CycleOutcome::Unchanged { ranges: count };
        }

        let diff = ranges.diff(current.applied.as_ref().unwrap_or(&IpRangeSet::new()));
        tracing::info!(
            "[Sync] Range set changed: +{} -{} ({} total)",
            diff.added.len(),
            diff.removed.len(),
            ranges.len()
        );

        if let Err(e) = self.access_file.write(&ranges).await {
            return self.record_failure(&e);
        }

        let reload = self.reloader.reload().await.map_err(|e| {
            tracing::error!("[Sync] Access file written but reload failed: {}", e);
            e.to_string()
        });
        let reload_ok = reload.is_ok();

        let count = ranges.len();
        self.status.publish(current.with_applied(ranges, reload, Utc::now()));

        CycleOutcome::Applied {
            ranges: count,
            added: diff.added.len(),
            removed: diff.removed.len(),
            reload_ok,
        }
    }
}

#[async_trait]
impl SyncCycle for Synchronizer {
    async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.cycle_lock.lock().await;
        let outcome = self.cycle().await;
        metrics::counter!("relaysync_sync_cycles_total", "outcome" => outcome.label()).increment(1);
        outcome
    }
}
