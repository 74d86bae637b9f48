//! mudcode error types

use thiserror::Error;

/// mudcode error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error, raised before any process is spawned
    #[error("Configuration error: {0}")]
    Config(String),

    /// A multiplexer or remote-shell command exited unsuccessfully
    #[error("Transport error: {context} (exit code: {}): {stderr}", exit_code_label(.exit_code))]
    Transport {
        /// What the bridge was doing when the command failed
        context: String,
        /// Exit code of the process, `None` when killed by a signal
        exit_code: Option<i32>,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// Bridge state file error
    #[error("State error: {0}")]
    State(String),

    /// IO error (including process spawn failures)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

impl Error {
    /// Exit code of the failed process, if this is a transport failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::Transport { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Result type alias for mudcode operations
pub type Result<T> = std::result::Result<T, Error>;
