//! Session management
//!
//! Drives tmux through the bound executor for one (project, agent, instance)
//! identity at a time. Sessions and windows are never torn down here; their
//! stable names are what lets later calls reach the same process again.

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::executor::{self, CommandExecutor, ExecOutput};
use crate::state::ProjectState;
use crate::tmux::capture::{recommend_with_baseline, CaptureConfig};
use crate::tmux::command::{
    capture_command, ensure_script, ensure_window_id, find_window_script, history_probe_command,
    is_window_id, window_target, EnsureOutcome, PLATFORM_PROBE,
};
use crate::tmux::window::{resolve_window_name, session_name_for};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

/// Platform assumed while the executing host cannot be probed
const UNKNOWN_PLATFORM: &str = "unknown";

/// Lifecycle of one identity within a bridge request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been attempted yet
    Unknown,
    /// Window name and capture parameters are being computed
    Resolving,
    /// Session and window are known to exist
    Active,
    /// Pane text was captured
    Captured,
    /// An executor call failed; the error was returned to the caller
    Failed,
}

impl SessionState {
    /// Whether the request reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Captured | SessionState::Failed)
    }
}

/// Where an identity lives and how much of it to capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWindow {
    /// tmux session name
    pub session: String,
    /// tmux window name
    pub window: String,
    /// tmux window id (`@N`), once the window has been located
    pub window_id: Option<String>,
    /// Capture sizes for this pane
    pub capture: CaptureConfig,
}

impl ResolvedWindow {
    /// Exact tmux target (`=session:@N`), once the window has been located
    pub fn target(&self) -> Option<String> {
        self.window_id
            .as_deref()
            .map(|id| window_target(&self.session, id))
    }
}

/// Text captured from a pane
#[derive(Debug, Clone)]
pub struct CapturedPane {
    /// tmux session name
    pub session: String,
    /// tmux window name
    pub window: String,
    /// tmux window id the text was read from
    pub window_id: String,
    /// Raw pane text
    pub text: String,
    /// Capture sizes used
    pub config: CaptureConfig,
    /// Capture timestamp (ms since epoch)
    pub captured_at: i64,
}

impl CapturedPane {
    /// Last `redraw_tail_lines` non-padding lines of the capture
    pub fn redraw_tail(&self) -> String {
        let lines: Vec<&str> = self.text.lines().collect();
        let end = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);
        let start = end.saturating_sub(self.config.redraw_tail_lines);
        lines[start..end].join("\n")
    }
}

/// Session manager
///
/// The state and depth maps hold one small entry per identity this manager
/// has touched and are only shrunk through [`SessionManager::forget`]. A
/// manager serves one bridge process, whose identities are bounded by the
/// project registry.
pub struct SessionManager {
    config: Arc<BridgeConfig>,
    executor: Arc<dyn CommandExecutor>,
    /// Executing host's platform, cached after the first successful probe
    platform: OnceCell<String>,
    /// Last observed scrollback depth per identity
    observed_depth: Arc<RwLock<HashMap<String, usize>>>,
    /// Lifecycle state per identity
    states: Arc<RwLock<HashMap<String, SessionState>>>,
}

fn identity_key(project_name: &str, agent_name: &str, instance_id: Option<&str>) -> String {
    format!(
        "{}:{}:{}",
        project_name,
        agent_name,
        instance_id.unwrap_or(agent_name)
    )
}

impl SessionManager {
    /// Create a session manager bound to one executor
    pub fn new(config: BridgeConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            config: Arc::new(config),
            executor,
            platform: OnceCell::new(),
            observed_depth: Arc::new(RwLock::new(HashMap::new())),
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a session manager with the executor the configuration selects
    pub fn from_config(config: BridgeConfig) -> Result<Self> {
        let executor = executor::from_config(&config.tmux)?;
        Ok(Self::new(config, executor))
    }

    /// Bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bound executor
    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    /// Platform of the host running tmux, lowercased (`linux`, `darwin`, ...).
    ///
    /// A failed probe yields `unknown` for this call only; the next call
    /// probes again.
    pub async fn platform(&self) -> String {
        match self.platform.get_or_try_init(|| self.probe_platform()).await {
            Ok(platform) => platform.clone(),
            Err(e) => {
                tracing::warn!(
                    executor = %self.executor.describe(),
                    "Platform probe failed, using default capture sizes: {}",
                    e
                );
                UNKNOWN_PLATFORM.to_string()
            }
        }
    }

    async fn probe_platform(&self) -> Result<String> {
        if let Some(hint) = self.executor.platform_hint() {
            return Ok(hint.trim().to_ascii_lowercase());
        }
        let output = self
            .executor
            .execute(PLATFORM_PROBE)
            .await?
            .into_result("probe platform")?;
        let platform = output.stdout.trim().to_ascii_lowercase();
        if platform.is_empty() {
            return Err(Error::Transport {
                context: "probe platform".to_string(),
                exit_code: output.exit_code,
                stderr: "empty output".to_string(),
            });
        }
        Ok(platform)
    }

    /// Current state of an identity
    pub async fn state(
        &self,
        project_name: &str,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> SessionState {
        let key = identity_key(project_name, agent_name, instance_id);
        self.states
            .read()
            .await
            .get(&key)
            .copied()
            .unwrap_or(SessionState::Unknown)
    }

    async fn set_state(&self, key: &str, state: SessionState) {
        self.states.write().await.insert(key.to_string(), state);
    }

    /// Last observed scrollback depth of an identity, 0 before any capture
    pub async fn observed_depth(
        &self,
        project_name: &str,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> usize {
        let key = identity_key(project_name, agent_name, instance_id);
        self.observed_depth
            .read()
            .await
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    /// Drop everything recorded for an identity; it reads as `Unknown` again
    pub async fn forget(&self, project_name: &str, agent_name: &str, instance_id: Option<&str>) {
        let key = identity_key(project_name, agent_name, instance_id);
        self.states.write().await.remove(&key);
        self.observed_depth.write().await.remove(&key);
    }

    /// Compute the window and capture sizes for an identity
    pub async fn resolve(
        &self,
        project: &ProjectState,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> ResolvedWindow {
        let key = identity_key(&project.project_name, agent_name, instance_id);
        self.set_state(&key, SessionState::Resolving).await;

        let session = session_name_for(project, &self.config.tmux);
        let window = resolve_window_name(project, agent_name, &self.config.tmux, instance_id);
        let observed = self
            .observed_depth(&project.project_name, agent_name, instance_id)
            .await;
        let platform = self.platform().await;
        let capture =
            recommend_with_baseline(observed, &platform, self.config.capture.history_lines);

        tracing::debug!(
            session = %session,
            window = %window,
            observed = observed,
            platform = %platform,
            history = capture.history_lines,
            "Resolved window"
        );

        ResolvedWindow {
            session,
            window,
            window_id: None,
            capture,
        }
    }

    /// Create the session and window if absent
    pub async fn ensure(
        &self,
        project: &ProjectState,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> Result<(ResolvedWindow, EnsureOutcome)> {
        let key = identity_key(&project.project_name, agent_name, instance_id);
        let mut resolved = self.resolve(project, agent_name, instance_id).await;

        let launch = self.config.agents.command_for(agent_name);
        let start_dir = project
            .project_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let script = ensure_script(&resolved.session, &resolved.window, launch, start_dir);
        let context = format!("ensure window {}:{}", resolved.session, resolved.window);

        let output = match self.run(&script, &context).await {
            Ok(output) => output,
            Err(e) => {
                self.set_state(&key, SessionState::Failed).await;
                return Err(e);
            }
        };

        let outcome = EnsureOutcome::parse(&output.stdout).unwrap_or(EnsureOutcome::Existing);
        resolved.window_id = ensure_window_id(&output.stdout);
        self.set_state(&key, SessionState::Active).await;

        if outcome.created() {
            tracing::info!(
                session = %resolved.session,
                window = %resolved.window,
                window_id = ?resolved.window_id,
                executor = %self.executor.describe(),
                outcome = ?outcome,
                "Created tmux window"
            );
        }

        Ok((resolved, outcome))
    }

    /// Capture the pane of an identity. The window must already exist.
    pub async fn capture(
        &self,
        project: &ProjectState,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> Result<CapturedPane> {
        let resolved = self.resolve(project, agent_name, instance_id).await;
        self.capture_resolved(&project.project_name, agent_name, instance_id, resolved)
            .await
    }

    /// Ensure the window exists, then capture it
    pub async fn ensure_and_capture(
        &self,
        project: &ProjectState,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> Result<CapturedPane> {
        let (resolved, _) = self.ensure(project, agent_name, instance_id).await?;
        self.capture_resolved(&project.project_name, agent_name, instance_id, resolved)
            .await
    }

    /// Window id of an existing window
    async fn locate(&self, resolved: &ResolvedWindow) -> Result<String> {
        if let Some(id) = &resolved.window_id {
            return Ok(id.clone());
        }
        let context = format!("locate window {}:{}", resolved.session, resolved.window);
        let script = find_window_script(&resolved.session, &resolved.window);
        let output = self.run(&script, &context).await?;
        let id = output.stdout.trim();
        if !is_window_id(id) {
            return Err(Error::Transport {
                context,
                exit_code: output.exit_code,
                stderr: format!("unexpected window id {:?}", id),
            });
        }
        Ok(id.to_string())
    }

    async fn capture_resolved(
        &self,
        project_name: &str,
        agent_name: &str,
        instance_id: Option<&str>,
        resolved: ResolvedWindow,
    ) -> Result<CapturedPane> {
        let key = identity_key(project_name, agent_name, instance_id);

        let window_id = match self.locate(&resolved).await {
            Ok(id) => id,
            Err(e) => {
                self.set_state(&key, SessionState::Failed).await;
                return Err(e);
            }
        };
        let target = window_target(&resolved.session, &window_id);
        let command = capture_command(&target, resolved.capture.history_lines);
        let context = format!("capture pane {}:{}", resolved.session, resolved.window);

        let output = match self.run(&command, &context).await {
            Ok(output) => output,
            Err(e) => {
                self.set_state(&key, SessionState::Failed).await;
                return Err(e);
            }
        };

        self.record_depth(&key, &target).await;
        self.set_state(&key, SessionState::Captured).await;

        Ok(CapturedPane {
            session: resolved.session,
            window: resolved.window,
            window_id,
            text: output.stdout,
            config: resolved.capture,
            captured_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    async fn run(&self, command: &str, context: &str) -> Result<ExecOutput> {
        let output = self.executor.execute(command).await?;
        output.into_result(context).map_err(|e| {
            tracing::warn!(executor = %self.executor.describe(), "{}", e);
            e
        })
    }

    // Depth is advisory; a failed probe keeps the previous value.
    async fn record_depth(&self, key: &str, target: &str) {
        let probe = history_probe_command(target);
        match self.executor.execute(&probe).await {
            Ok(out) if out.success() => match out.stdout.trim().parse::<usize>() {
                Ok(depth) => {
                    self.observed_depth
                        .write()
                        .await
                        .insert(key.to_string(), depth);
                }
                Err(_) => {
                    tracing::debug!(
                        pane = %target,
                        output = %out.stdout.trim(),
                        "Unparsable history depth"
                    );
                }
            },
            Ok(out) => {
                tracing::debug!(
                    pane = %target,
                    exit_code = ?out.exit_code,
                    "History depth probe failed"
                );
            }
            Err(e) => {
                tracing::debug!(pane = %target, "History depth probe failed: {}", e);
            }
        }
    }
}
