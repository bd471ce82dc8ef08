//! Postfix reload invocation.
//!
//! [`Reloader`] is the seam the synchronizer calls after a successful write;
//! [`PostfixReloader`] drives the real `postfix` control binary.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{CoreError, CoreResult};

/// Anything that can make the mail agent pick up the new access file.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self) -> CoreResult<()>;
}

/// Output of one control command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub(crate) fn describe(&self) -> String {
        let detail =
            if self.stderr.trim().is_empty() { self.stdout.trim() } else { self.stderr.trim() };
        match self.code {
            Some(code) => format!("exit status {code}: {detail}"),
            None => format!("terminated by signal: {detail}"),
        }
    }
}

/// Runs `postfix status`, starts Postfix if it is down, then `postfix reload`.
#[derive(Debug, Clone)]
pub struct PostfixReloader {
    bin: String,
    timeout: Duration,
}

impl PostfixReloader {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self { bin: bin.into(), timeout }
    }

    async fn run(&self, arg: &str) -> CoreResult<CommandOutput> {
        run_command(&self.bin, &[arg], self.timeout).await
    }
}

/// Run a control command under `timeout`, capturing its output.
///
/// Spawn failures and timeouts are errors; a non-zero exit is not.
pub(crate) async fn run_command(
    bin: &str,
    args: &[&str],
    timeout: Duration,
) -> CoreResult<CommandOutput> {
    let line = format!("{bin} {}", args.join(" "));
    let mut command = Command::new(bin);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| CoreError::Reload(format!("`{line}` timed out after {timeout:?}")))?
        .map_err(|e| CoreError::Reload(format!("failed to run `{line}`: {e}")))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

#[async_trait]
impl Reloader for PostfixReloader {
    async fn reload(&self) -> CoreResult<()> {
        let status = self.run("status").await?;
        if !status.success {
            tracing::info!("[Sync] Postfix is not running, starting it");
            let start = self.run("start").await?;
            if !start.success {
                return Err(CoreError::Reload(format!("postfix start: {}", start.describe())));
            }
        }

        let reload = self.run("reload").await?;
        if !reload.success {
            return Err(CoreError::Reload(format!("postfix reload: {}", reload.describe())));
        }

        tracing::info!("[Sync] Postfix configuration reloaded");
        Ok(())
    }
}
