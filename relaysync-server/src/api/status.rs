use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use relaysync_types::SyncFailure;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub last_sync: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_applied: Option<DateTime<Utc>>,
    pub range_count: usize,
    pub consecutive_failures: u32,
    pub total_cycles: u64,
    pub last_error: Option<SyncFailure>,
    pub reload_success: Option<bool>,
    pub upstream_url: String,
    pub sync_interval_secs: u64,
    pub version: &'static str,
    pub uptime_secs: i64,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.snapshot();
    let inner = &state.inner;

    Json(StatusResponse {
        last_sync: snapshot.last_sync,
        last_attempt: snapshot.last_attempt,
        last_applied: snapshot.last_applied,
        range_count: snapshot.range_count,
        consecutive_failures: snapshot.consecutive_failures,
        total_cycles: snapshot.total_cycles,
        last_error: snapshot.last_error.clone(),
        reload_success: snapshot.reload_success,
        upstream_url: inner.upstream_url.clone(),
        sync_interval_secs: inner.sync_interval_secs,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - inner.started_at).num_seconds(),
    })
}
