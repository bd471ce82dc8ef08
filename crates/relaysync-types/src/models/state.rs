//! Shared synchronization status record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::IpRangeSet;
use crate::error::{SyncErrorKind, SyncFailure};

/// Snapshot of the synchronizer's status.
///
/// Snapshots are immutable once published: every transition below returns a
/// new value and the synchronizer swaps it in as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Last cycle whose fetch and parse succeeded
    pub last_sync: Option<DateTime<Utc>>,
    /// Last cycle start, successful or not
    pub last_attempt: Option<DateTime<Utc>>,
    /// Last time the access file was rewritten
    pub last_applied: Option<DateTime<Utc>>,
    /// Size of the applied range set
    pub range_count: usize,
    pub consecutive_failures: u32,
    pub total_cycles: u64,
    pub last_error: Option<SyncFailure>,
    /// Reload outcome of the most recent change; `None` until a change is applied
    pub reload_success: Option<bool>,
    /// Range set currently reflected in the access file
    #[serde(skip)]
    pub applied: Option<IpRangeSet>,
}

impl SyncState {
    /// The "not yet synced" state published at process start.
    pub fn initial() -> Self {
        Self::default()
    }

    /// True when `candidate` is exactly what the access file already holds.
    pub fn is_applied(&self, candidate: &IpRangeSet) -> bool {
        self.applied.as_ref() == Some(candidate)
    }

    /// Fetch, parse or write failed: nothing on disk changed.
    pub fn with_failure(
        &self,
        kind: SyncErrorKind,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            last_attempt: Some(now),
            consecutive_failures: self.consecutive_failures.saturating_add(1),
            total_cycles: self.total_cycles.saturating_add(1),
            last_error: Some(SyncFailure::new(kind, message, now)),
            ..self.clone()
        }
    }

    /// Upstream matched the applied set.
    ///
    /// Transient errors are cleared; a reload failure stays visible until the
    /// next change is applied successfully, since the agent may still be
    /// running the previous policy.
    pub fn with_unchanged(&self, now: DateTime<Utc>) -> Self {
        let last_error = self.last_error.clone().filter(|e| e.kind == SyncErrorKind::Reload);
        Self {
            last_sync: Some(now),
            last_attempt: Some(now),
            consecutive_failures: 0,
            total_cycles: self.total_cycles.saturating_add(1),
            last_error,
            ..self.clone()
        }
    }

    /// The access file already renders `applied`, so it is taken over as-is
    /// without a write or a reload.
    pub fn with_adopted(&self, applied: IpRangeSet, now: DateTime<Utc>) -> Self {
        Self { range_count: applied.len(), applied: Some(applied), ..self.with_unchanged(now) }
    }

    /// A new set was written to disk; `reload` carries the reload outcome.
    pub fn with_applied(
        &self,
        applied: IpRangeSet,
        reload: Result<(), String>,
        now: DateTime<Utc>,
    ) -> Self {
        let (reload_success, last_error) = match reload {
            Ok(()) => (true, None),
            Err(message) => (false, Some(SyncFailure::new(SyncErrorKind::Reload, message, now))),
        };
        Self {
            last_sync: Some(now),
            last_attempt: Some(now),
            last_applied: Some(now),
            range_count: applied.len(),
            consecutive_failures: 0,
            total_cycles: self.total_cycles.saturating_add(1),
            last_error,
            reload_success: Some(reload_success),
            applied: Some(applied),
        }
    }
}
