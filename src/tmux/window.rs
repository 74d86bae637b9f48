//! Window identity resolution
//!
//! A window name is how the bridge finds the same live agent process again
//! on every call, so resolution is deterministic and recorded names always
//! outrank anything computed here.

use crate::config::{TmuxConfig, DEFAULT_SHARED_SESSION};
use crate::state::ProjectState;

/// Longest window name ever produced by [`sanitize`]
pub const MAX_WINDOW_NAME_LEN: usize = 80;

fn is_window_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if is_window_char(c) { c } else { '-' };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches('-');
    // Only ASCII remains, so byte and char positions agree.
    let truncated = &trimmed[..trimmed.len().min(MAX_WINDOW_NAME_LEN)];
    truncated.trim_end_matches('-').to_string()
}

/// Multiplexer-safe window name for `token` within `project_name`.
///
/// The result only contains `[A-Za-z0-9._-]`, has no `--` and no leading or
/// trailing `-`, and is at most 80 characters. A token that is already
/// scoped to the project is not prefixed twice. When nothing survives
/// cleaning the raw token is returned unmodified.
pub fn sanitize(project_name: &str, token: &str) -> String {
    let project = clean(project_name);
    let cleaned_token = clean(token);

    let already_scoped = !project.is_empty()
        && (cleaned_token == project || cleaned_token.starts_with(&format!("{}-", project)));

    let name = if already_scoped {
        cleaned_token
    } else {
        clean(&format!("{}-{}", project_name, token))
    };

    if name.is_empty() {
        token.to_string()
    } else {
        name
    }
}

/// Window name for an instance of `base`, without prefixing the base twice
pub fn project_scoped_name(project_name: &str, base: &str, instance_id: &str) -> String {
    if instance_id == base {
        return sanitize(project_name, base);
    }
    if instance_id.starts_with(&format!("{}-", base)) {
        return sanitize(project_name, instance_id);
    }
    sanitize(project_name, &format!("{}-{}", base, instance_id))
}

/// Name of the session shared by all projects
pub fn shared_session_name(config: &TmuxConfig) -> String {
    let suffix = config
        .shared_session_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SHARED_SESSION);
    format!("{}{}", config.session_prefix, suffix)
}

// tmux itself rewrites '.' and ':' in session names.
fn tmux_session_safe(name: &str) -> String {
    name.replace(['.', ':'], "_")
}

/// Session hosting a project's windows: the recorded one, else the shared
/// session when configured, else a per-project session
pub fn session_name_for(project: &ProjectState, config: &TmuxConfig) -> String {
    let recorded = project.tmux_session.trim();
    if !recorded.is_empty() {
        return tmux_session_safe(recorded);
    }
    if config.shared_session_name.is_some() {
        return tmux_session_safe(&shared_session_name(config));
    }
    tmux_session_safe(&format!("{}{}", config.session_prefix, project.project_name))
}

/// Resolve the window for an agent (or one instance of it) in a project.
///
/// First match wins:
/// 1. the instance's recorded window
/// 2. the agent's primary instance's recorded window
/// 3. the legacy per-agent window mapping
/// 4. in the shared session, a sanitized project-scoped name
/// 5. the raw instance id, or the agent name
pub fn resolve_window_name(
    project: &ProjectState,
    agent_name: &str,
    config: &TmuxConfig,
    instance_id: Option<&str>,
) -> String {
    let instance_id = instance_id.map(str::trim).filter(|id| !id.is_empty());

    if let Some(window) = instance_id
        .and_then(|id| project.instance(id))
        .and_then(|i| i.recorded_window())
    {
        return window.to_string();
    }

    if let Some(window) = project.primary_window(agent_name) {
        return window.to_string();
    }

    if let Some(window) = project.legacy_window(agent_name) {
        return window.to_string();
    }

    let token = instance_id.unwrap_or(agent_name);
    if session_name_for(project, config) == tmux_session_safe(&shared_session_name(config)) {
        return sanitize(&project.project_name, token);
    }

    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AgentInstance;
    use std::collections::HashMap;

    fn is_valid_window_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= MAX_WINDOW_NAME_LEN
            && name.chars().all(is_window_char)
            && !name.starts_with('-')
            && !name.ends_with('-')
            && !name.contains("--")
    }

    fn shared_project(name: &str) -> ProjectState {
        ProjectState {
            project_name: name.to_string(),
            tmux_session: "agent-bridge".to_string(),
            ..ProjectState::default()
        }
    }

    fn instance(id: &str, agent: &str, window: Option<&str>) -> AgentInstance {
        AgentInstance {
            instance_id: id.to_string(),
            agent_name: agent.to_string(),
            tmux_window: window.map(str::to_string),
            channel_id: None,
        }
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize("demo", "claude"), "demo-claude");
        assert_eq!(sanitize("my project", "claude:2"), "my-project-claude-2");
        assert_eq!(sanitize("a\tb\r\nc", "x"), "a-b-c-x");
        assert_eq!(sanitize("--proj--", "--tok--"), "proj-tok");
        assert_eq!(sanitize("v1.2_beta", "codex"), "v1.2_beta-codex");
    }

    #[test]
    fn test_sanitize_adversarial_input() {
        let long = "x".repeat(500);
        let inputs = [
            "$(rm -rf ~)",
            "a;b|c&d",
            "'quoted' \"double\"",
            "日本語-エージェント",
            "🦀🦀🦀 crab",
            "::::",
            "name\nwith\nnewlines",
            long.as_str(),
        ];
        for project in ["demo", "proj name", "日本 app"] {
            for token in inputs {
                let name = sanitize(project, token);
                assert!(is_valid_window_name(&name), "{project:?} {token:?} -> {name:?}");
            }
        }
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let tokens = ["claude", "claude-2", "a b c", "x:y", "", "🦀 rust", "demo", "demo-x"];
        for token in tokens {
            let once = sanitize("demo", token);
            assert_eq!(sanitize("demo", &once), once, "token {token:?}");
        }
        let long = "y".repeat(200);
        let once = sanitize("demo", &long);
        assert_eq!(once.len(), MAX_WINDOW_NAME_LEN);
        assert_eq!(sanitize("demo", &once), once);
    }

    #[test]
    fn test_already_scoped_tokens_share_a_name() {
        // Keeping sanitize idempotent means a token that already carries the
        // project prefix is not prefixed again, so these identities collide.
        assert_eq!(sanitize("demo", "demo"), "demo");
        assert_eq!(sanitize("demo", "claude"), sanitize("demo", "demo-claude"));

        let project = shared_project("demo");
        let config = TmuxConfig::default();
        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("claude")),
            resolve_window_name(&project, "claude", &config, Some("demo-claude")),
        );

        // A recorded window keeps the second instance apart
        let mut recorded = shared_project("demo");
        recorded.instances = vec![instance("demo-claude", "claude", Some("demo-claude-2"))];
        assert_eq!(
            resolve_window_name(&recorded, "claude", &config, Some("demo-claude")),
            "demo-claude-2"
        );
    }

    #[test]
    fn test_sanitize_truncation_strips_trailing_dash() {
        let token = format!("{}-tail", "a".repeat(74));
        let name = sanitize("demo", &token);
        assert!(is_valid_window_name(&name));
        assert_eq!(name.len(), 79);
    }

    #[test]
    fn test_sanitize_empty_falls_back_to_token() {
        assert_eq!(sanitize("", "!!!"), "!!!");
        assert_eq!(sanitize("???", "claude"), "claude");
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        assert_eq!(sanitize("proj", "claude-2"), sanitize("proj", "claude-2"));
    }

    #[test]
    fn test_project_scoped_name() {
        assert_eq!(
            project_scoped_name("proj", "claude", "claude"),
            sanitize("proj", "claude")
        );
        assert_eq!(
            project_scoped_name("proj", "claude", "claude-2"),
            sanitize("proj", "claude-2")
        );
        assert_eq!(
            project_scoped_name("proj", "claude", "other"),
            sanitize("proj", "claude-other")
        );
        assert_eq!(project_scoped_name("proj", "claude", "other"), "proj-claude-other");
    }

    #[test]
    fn test_shared_session_name() {
        let mut config = TmuxConfig::default();
        assert_eq!(shared_session_name(&config), "agent-bridge");
        config.shared_session_name = Some("all".to_string());
        assert_eq!(shared_session_name(&config), "agent-all");
        config.shared_session_name = Some("  ".to_string());
        assert_eq!(shared_session_name(&config), "agent-bridge");
    }

    #[test]
    fn test_session_name_for() {
        let mut config = TmuxConfig::default();
        let mut project = ProjectState {
            project_name: "demo".to_string(),
            ..ProjectState::default()
        };
        assert_eq!(session_name_for(&project, &config), "agent-demo");

        config.shared_session_name = Some("bridge".to_string());
        assert_eq!(session_name_for(&project, &config), "agent-bridge");

        project.tmux_session = "custom".to_string();
        assert_eq!(session_name_for(&project, &config), "custom");

        let dotted = ProjectState {
            project_name: "site.v2".to_string(),
            ..ProjectState::default()
        };
        assert_eq!(session_name_for(&dotted, &TmuxConfig::default()), "agent-site_v2");
    }

    #[test]
    fn test_recorded_instance_window_wins() {
        let mut project = shared_project("demo");
        project.instances = vec![
            instance("claude", "claude", Some("weird name:1")),
            instance("claude-2", "claude", Some("legacy-window-2")),
        ];
        project
            .tmux_windows
            .insert("claude".to_string(), "legacy".to_string());
        let config = TmuxConfig::default();

        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("claude-2")),
            "legacy-window-2"
        );
        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("claude")),
            "weird name:1"
        );
    }

    #[test]
    fn test_primary_instance_window() {
        let mut project = shared_project("demo");
        project.instances = vec![
            instance("claude-2", "claude", Some("w2")),
            instance("claude", "claude", Some("w1")),
        ];
        let config = TmuxConfig::default();

        assert_eq!(resolve_window_name(&project, "claude", &config, None), "w1");
        // Unknown instance falls through to the primary
        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("claude-9")),
            "w1"
        );
    }

    #[test]
    fn test_legacy_mapping() {
        let mut project = shared_project("demo");
        project.tmux_windows = HashMap::from([("codex".to_string(), "old-codex".to_string())]);
        let config = TmuxConfig::default();
        assert_eq!(resolve_window_name(&project, "codex", &config, None), "old-codex");
    }

    #[test]
    fn test_shared_session_sanitizes() {
        let project = shared_project("my demo");
        let config = TmuxConfig::default();
        assert_eq!(
            resolve_window_name(&project, "claude", &config, None),
            "my-demo-claude"
        );
        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("claude-2")),
            "my-demo-claude-2"
        );

        // No recorded session, shared session configured
        let unrecorded = ProjectState {
            project_name: "demo".to_string(),
            ..ProjectState::default()
        };
        let shared = TmuxConfig {
            shared_session_name: Some("bridge".to_string()),
            ..TmuxConfig::default()
        };
        assert_eq!(resolve_window_name(&unrecorded, "codex", &shared, None), "demo-codex");
    }

    #[test]
    fn test_dedicated_session_uses_raw_identifier() {
        let project = ProjectState {
            project_name: "demo".to_string(),
            tmux_session: "agent-demo".to_string(),
            ..ProjectState::default()
        };
        let config = TmuxConfig::default();
        assert_eq!(resolve_window_name(&project, "claude", &config, None), "claude");
        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("claude-2")),
            "claude-2"
        );
        assert_eq!(
            resolve_window_name(&project, "claude", &config, Some("  ")),
            "claude"
        );
    }
}
