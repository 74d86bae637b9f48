//! mudcode configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default suffix of the shared tmux session when none is configured
pub const DEFAULT_SHARED_SESSION: &str = "bridge";

/// Main mudcode configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// tmux / transport configuration
    #[serde(default)]
    pub tmux: TmuxConfig,

    /// Capture buffer configuration
    #[serde(default)]
    pub capture: CaptureSettings,

    /// Agent launch commands
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: BridgeConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded bridge configuration");
        Ok(config)
    }

    /// Load from `path` if given, else from the default location when it
    /// exists, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match dirs::mudcode_dir().map(|d| d.join("config.toml")) {
            Some(default_path) if default_path.exists() => Self::load(&default_path),
            _ => Ok(Self::default()),
        }
    }
}

/// Transport used to reach the tmux server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// tmux runs on this host
    #[default]
    Local,

    /// tmux runs on a remote host reached over ssh
    Ssh,
}

/// tmux configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TmuxConfig {
    /// Prefix for every session the bridge creates
    pub session_prefix: String,

    /// Name (without prefix) of the session shared by all projects
    #[serde(default)]
    pub shared_session_name: Option<String>,

    /// Transport mode
    #[serde(default)]
    pub transport: Transport,

    /// ssh destination, `host`, `user@host` or `host:port`
    #[serde(default)]
    pub ssh_target: Option<String>,

    /// Explicit ssh port; out-of-range values are ignored
    #[serde(default)]
    pub ssh_port: Option<i64>,

    /// ssh identity file
    #[serde(default)]
    pub ssh_identity: Option<String>,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            session_prefix: "agent-".to_string(),
            shared_session_name: None,
            transport: Transport::Local,
            ssh_target: None,
            ssh_port: None,
            ssh_identity: None,
        }
    }
}

/// Capture configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSettings {
    /// Overrides the platform history baseline
    #[serde(default)]
    pub history_lines: Option<usize>,
}

/// Agent launch commands, keyed by agent name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Command started in a freshly created window for that agent
    #[serde(default)]
    pub commands: HashMap<String, String>,
}

impl AgentsConfig {
    /// Launch command for an agent, if one is configured
    pub fn command_for(&self, agent_name: &str) -> Option<&str> {
        self.commands
            .get(agent_name)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// Path of the project registry written by the persistence layer
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::mudcode_dir().unwrap_or_else(|| PathBuf::from(".mudcode"));
        Self {
            state_path: base.join("state.json"),
        }
    }
}

// Helper module for default directories
mod dirs {
    use std::path::PathBuf;

    pub fn mudcode_dir() -> Option<PathBuf> {
        std::env::var("HOME")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .map(|h| PathBuf::from(h).join(".mudcode"))
    }
}
