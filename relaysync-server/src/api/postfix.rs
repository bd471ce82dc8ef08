use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use relaysync_core::{AgentReport, FileInfo};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostfixResponse {
    pub access_file: String,
    pub range_count: usize,
    pub trusted_networks: Vec<String>,
    pub applied_at: Option<DateTime<Utc>>,
    pub reload_success: Option<bool>,
    pub file: FileInfo,
    /// Live state of the local Postfix instance
    pub agent: AgentReport,
}

pub async fn get_postfix(State(state): State<AppState>) -> Json<PostfixResponse> {
    let snapshot = state.snapshot();
    let access_file = state.access_file();
    let (file, agent) = tokio::join!(access_file.info(), state.agent().inspect());

    Json(PostfixResponse {
        access_file: access_file.path().display().to_string(),
        range_count: snapshot.range_count,
        trusted_networks: access_file.trusted().iter().map(ToString::to_string).collect(),
        applied_at: snapshot.last_applied,
        reload_success: snapshot.reload_success,
        file,
        agent,
    })
}
