//! Test helpers for relaysync-server unit tests.

use relaysync_core::metrics::prometheus::detached_handle;
use relaysync_core::{status_channel, AccessFile, PostfixAgent, StatusPublisher};
use std::time::Duration;
use tempfile::TempDir;

use crate::state::AppState;

pub const TEST_UPSTREAM_URL: &str = "https://ip-ranges.example.test/";

/// Create a minimal `AppState` for testing.
///
/// Returns `(AppState, TempDir)`; keep `TempDir` alive for the test duration.
pub fn test_app_state() -> (AppState, TempDir) {
    let (state, _publisher, temp_dir) = test_app_state_with_status();
    (state, temp_dir)
}

/// Like [`test_app_state`] but also hands back the publisher so a test can
/// drive the snapshot the handlers see. Postfix is absent.
pub fn test_app_state_with_status() -> (AppState, StatusPublisher, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let agent = PostfixAgent::new(
        temp_dir.path().join("missing-postfix").display().to_string(),
        temp_dir.path().join("missing-postqueue").display().to_string(),
        temp_dir.path(),
        Duration::from_secs(2),
    );
    let (state, publisher) = test_app_state_in(&temp_dir, agent);
    (state, publisher, temp_dir)
}

/// State whose access file lives in `dir`, inspecting Postfix through `agent`.
pub fn test_app_state_in(dir: &TempDir, agent: PostfixAgent) -> (AppState, StatusPublisher) {
    let access_file = AccessFile::new(
        dir.path().join("clients.cidr"),
        TEST_UPSTREAM_URL,
        vec!["127.0.0.0/8".parse().expect("valid CIDR")],
    );
    let (publisher, status) = status_channel();
    let state =
        AppState::new(status, access_file, agent, TEST_UPSTREAM_URL, 3600, detached_handle());
    (state, publisher)
}
