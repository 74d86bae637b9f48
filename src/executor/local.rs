//! Local command execution

use super::{CommandExecutor, ExecOutput};
use crate::error::Result;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Runs commands through `sh -c` on this host
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a local executor
    pub fn new() -> Self {
        Self
    }
}

/// Run `program args...` to completion, capturing output.
pub(crate) async fn run_captured(program: &str, args: &[&str]) -> Result<ExecOutput> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    Ok(ExecOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run `program args...` to completion, discarding output.
pub(crate) async fn run_discarded(program: &str, args: &[&str]) -> Result<Option<i32>> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await?;
    Ok(status.code())
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    fn describe(&self) -> String {
        "local".to_string()
    }

    fn platform_hint(&self) -> Option<String> {
        Some(std::env::consts::OS.to_string())
    }

    async fn execute(&self, command: &str) -> Result<ExecOutput> {
        tracing::debug!(executor = "local", command = command, "Executing command");
        run_captured("sh", &["-c", command]).await
    }

    async fn execute_void(&self, command: &str) -> Result<Option<i32>> {
        tracing::debug!(executor = "local", command = command, "Executing command (void)");
        run_discarded("sh", &["-c", command]).await
    }
}
