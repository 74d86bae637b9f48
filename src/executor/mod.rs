//! Command execution, locally or over ssh
//!
//! Session logic talks to tmux through a [`CommandExecutor`] and never
//! branches on which transport is bound. Both variants take one fully formed
//! shell command string:
//!
//! ```text
//! SessionManager ──► Arc<dyn CommandExecutor>
//!                      ├ LocalExecutor   sh -c <command>
//!                      └ SshExecutor     sh -c 'ssh' '-o' 'BatchMode=yes' ... <target> <command>
//! ```

mod local;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;
mod target;

pub use local::LocalExecutor;
pub use ssh::SshExecutor;
pub use target::RemoteTarget;

use crate::config::{TmuxConfig, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Output of a command run to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into a transport error carrying its details
    pub fn into_result(self, context: impl Into<String>) -> Result<ExecOutput> {
        if self.success() {
            return Ok(self);
        }
        Err(Error::Transport {
            context: context.into(),
            exit_code: self.exit_code,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Runs shell commands on the host that owns the tmux server
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Short label used in logs, e.g. `local` or `ssh:devbox`
    fn describe(&self) -> String;

    /// Platform of the executing host when known without probing it
    fn platform_hint(&self) -> Option<String>;

    /// Run a command and capture its output and exit status
    async fn execute(&self, command: &str) -> Result<ExecOutput>;

    /// Run a command discarding its output; returns the exit code only
    async fn execute_void(&self, command: &str) -> Result<Option<i32>>;
}

/// Build the executor selected by the tmux configuration.
///
/// Fails with [`Error::Config`] before anything is spawned when the ssh
/// transport is selected without a target.
pub fn from_config(config: &TmuxConfig) -> Result<Arc<dyn CommandExecutor>> {
    match config.transport {
        Transport::Local => Ok(Arc::new(LocalExecutor::new())),
        Transport::Ssh => {
            let raw = config
                .ssh_target
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    Error::Config(
                        "tmux.transport is \"ssh\" but tmux.sshTarget is not set".to_string(),
                    )
                })?;
            let target =
                RemoteTarget::resolve(raw, config.ssh_port, config.ssh_identity.as_deref())?;
            Ok(Arc::new(SshExecutor::new(target)))
        }
    }
}

/// Quote one token for a POSIX shell.
pub fn shell_quote(raw: &str) -> String {
    if raw.is_empty() {
        return "''".to_string();
    }
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('\'');
    for ch in raw.chars() {
        if ch == '\'' {
            quoted.push_str("'\"'\"'");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

/// Quote every token and join them with spaces.
pub fn shell_join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| shell_quote(t.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
