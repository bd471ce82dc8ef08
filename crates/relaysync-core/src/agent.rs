//! Read-only Postfix agent checks.
//!
//! Backs the `agent` block of `/postfix`:
//! - `postfix status` tells whether the master process is up
//! - `postfix check` validates the configuration
//! - `postqueue -p` gives the queue size
//!
//! Nothing here changes Postfix state. Every command runs under the control
//! command timeout, and a command that cannot run counts as a failed check.

use relaysync_types::SyncConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::access_file::FileInfo;
use crate::error::CoreResult;
use crate::reload::{run_command, CommandOutput};

/// Queue sizes at or above this are reported unhealthy.
pub const QUEUE_WARN_MESSAGES: usize = 50;

const CONFIG_FILES: &[&str] = &["main.cf", "master.cf"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport {
    /// Running, valid configuration and a healthy queue
    pub healthy: bool,
    pub running: bool,
    pub config_valid: bool,
    pub queue: QueueReport,
    pub config_files: BTreeMap<String, FileInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueReport {
    /// `None` when the queue could not be listed
    pub total_messages: Option<usize>,
    pub healthy: bool,
}

/// Inspects the local Postfix instance on demand.
#[derive(Debug, Clone)]
pub struct PostfixAgent {
    postfix_bin: String,
    postqueue_bin: String,
    config_dir: PathBuf,
    timeout: Duration,
}

impl PostfixAgent {
    pub fn new(
        postfix_bin: impl Into<String>,
        postqueue_bin: impl Into<String>,
        config_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            postfix_bin: postfix_bin.into(),
            postqueue_bin: postqueue_bin.into(),
            config_dir: config_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            &config.postfix_bin,
            &config.postqueue_bin,
            &config.postfix_config_dir,
            config.reload_timeout(),
        )
    }

    pub async fn inspect(&self) -> AgentReport {
        let (status, check, listing) = tokio::join!(
            run_command(&self.postfix_bin, &["status"], self.timeout),
            run_command(&self.postfix_bin, &["check"], self.timeout),
            run_command(&self.postqueue_bin, &["-p"], self.timeout),
        );

        let mut errors = Vec::new();
        let running = passed("postfix status", status, &mut errors);
        let config_valid = passed("postfix check", check, &mut errors);
        let queue = match listing {
            Ok(out) if out.success => match queue_size(&out.stdout) {
                Some(count) => QueueReport {
                    total_messages: Some(count),
                    healthy: count < QUEUE_WARN_MESSAGES,
                },
                None => {
                    errors.push("postqueue -p: unrecognised output".to_string());
                    QueueReport::default()
                },
            },
            Ok(out) => {
                errors.push(format!("postqueue -p: {}", out.describe()));
                QueueReport::default()
            },
            Err(e) => {
                errors.push(e.to_string());
                QueueReport::default()
            },
        };

        let mut config_files = BTreeMap::new();
        for name in CONFIG_FILES {
            let info = FileInfo::stat(&self.config_dir.join(name)).await;
            config_files.insert((*name).to_string(), info);
        }

        let healthy = running && config_valid && queue.healthy;
        if !healthy {
            tracing::debug!("[Postfix] Agent unhealthy: {}", errors.join("; "));
        }

        AgentReport { healthy, running, config_valid, queue, config_files, errors }
    }
}

fn passed(label: &str, result: CoreResult<CommandOutput>, errors: &mut Vec<String>) -> bool {
    match result {
        Ok(out) if out.success => true,
        Ok(out) => {
            errors.push(format!("{label}: {}", out.describe()));
            false
        },
        Err(e) => {
            errors.push(e.to_string());
            false
        },
    }
}

/// Message count from `postqueue -p` output.
///
/// A non-empty listing ends with `-- <size> Kbytes in <n> Request(s).`.
fn queue_size(output: &str) -> Option<usize> {
    let output = output.trim();
    if output.is_empty() || output.contains("Mail queue is empty") {
        return Some(0);
    }
    let trailer = output.lines().last()?.trim();
    if !trailer.starts_with("--") {
        return None;
    }
    trailer.split_whitespace().skip_while(|w| *w != "in").nth(1)?.parse().ok()
}
