//! Remote command execution over ssh

use super::local::{run_captured, run_discarded};
use super::{shell_join, CommandExecutor, ExecOutput, RemoteTarget};
use crate::error::Result;
use async_trait::async_trait;

/// Runs commands on a remote host through the `ssh` client.
///
/// `BatchMode=yes` keeps ssh from ever prompting: a host that would need a
/// password fails within the client's own connect timeout instead of hanging.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    target: RemoteTarget,
    /// ssh client program
    program: String,
}

impl SshExecutor {
    /// Create an executor bound to one remote target
    pub fn new(target: RemoteTarget) -> Self {
        Self {
            target,
            program: "ssh".to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The bound target
    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// ssh argv for a remote command, unquoted
    pub fn ssh_args(&self, remote_command: &str) -> Vec<String> {
        let mut args = vec![
            self.program.clone(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(port) = self.target.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = self.target.identity_file.as_deref() {
            args.push("-i".to_string());
            args.push(identity.to_string());
        }
        args.push(self.target.host_spec.clone());
        args.push(remote_command.to_string());
        args
    }

    /// Local shell line running `remote_command` on the target, every token
    /// quoted individually
    pub fn invocation(&self, remote_command: &str) -> String {
        shell_join(&self.ssh_args(remote_command))
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    fn describe(&self) -> String {
        format!("ssh:{}", self.target.display_name())
    }

    fn platform_hint(&self) -> Option<String> {
        None
    }

    async fn execute(&self, command: &str) -> Result<ExecOutput> {
        let line = self.invocation(command);
        tracing::debug!(
            executor = %self.describe(),
            command = command,
            "Executing remote command"
        );
        let output = run_captured("sh", &["-c", &line]).await?;
        if output.exit_code == Some(255) {
            tracing::warn!(
                target_host = %self.target.display_name(),
                stderr = %output.stderr.trim(),
                "ssh exited with 255, connection or authentication failure"
            );
        }
        Ok(output)
    }

    async fn execute_void(&self, command: &str) -> Result<Option<i32>> {
        let line = self.invocation(command);
        tracing::debug!(
            executor = %self.describe(),
            command = command,
            "Executing remote command (void)"
        );
        run_discarded("sh", &["-c", &line]).await
    }
}
