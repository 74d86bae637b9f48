//! Project registry snapshot
//!
//! The registry (`state.json`) is owned and written by the persistence layer.
//! The bridge only reads it, once per request, so a window recorded by
//! another process is always picked up on the next call.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// All projects known to the bridge
#[derive(Debug, Default, Deserialize)]
pub struct BridgeState {
    #[serde(default)]
    pub projects: HashMap<String, ProjectState>,
}

/// One project's tmux bookkeeping
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub project_path: Option<String>,
    #[serde(default)]
    pub tmux_session: String,
    /// Legacy agent → window mapping from before per-instance records
    #[serde(default)]
    pub tmux_windows: HashMap<String, String>,
    #[serde(default, deserialize_with = "instances_from_list_or_map")]
    pub instances: Vec<AgentInstance>,
    /// Legacy agent → channel mapping
    #[serde(default)]
    pub discord_channels: HashMap<String, Option<String>>,
}

/// A running instance of an agent within a project
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInstance {
    #[serde(default)]
    pub instance_id: String,
    #[serde(default, alias = "agentType")]
    pub agent_name: String,
    #[serde(default)]
    pub tmux_window: Option<String>,
    #[serde(default, alias = "discordChannelId")]
    pub channel_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InstancesRepr {
    List(Vec<AgentInstance>),
    Map(BTreeMap<String, AgentInstance>),
}

// Older registries key instances by id instead of listing them.
fn instances_from_list_or_map<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<AgentInstance>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match InstancesRepr::deserialize(deserializer)? {
        InstancesRepr::List(list) => list,
        InstancesRepr::Map(map) => map
            .into_iter()
            .map(|(key, mut instance)| {
                if instance.instance_id.trim().is_empty() {
                    instance.instance_id = key;
                }
                instance
            })
            .collect(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl BridgeState {
    /// Load the registry. A missing file is an empty registry; an unreadable
    /// or malformed one is an error.
    pub fn try_load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let mut state: BridgeState = serde_json::from_str(&data)
            .map_err(|e| Error::State(format!("Invalid state file {}: {}", path.display(), e)))?;
        for (name, project) in state.projects.iter_mut() {
            if project.project_name.trim().is_empty() {
                project.project_name = name.clone();
            }
        }
        Ok(state)
    }

    /// Load the registry, treating any failure as an empty registry
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring bridge state: {}", e);
                Self::default()
            }
        }
    }

    /// Look up a project by name
    pub fn project(&self, project_name: &str) -> Option<&ProjectState> {
        self.projects.get(project_name)
    }

    /// Channel for a project's agent, using the same precedence as window
    /// names: exact instance, then primary instance, then legacy mapping
    pub fn find_channel_id(
        &self,
        project_name: &str,
        agent_name: &str,
        instance_id: Option<&str>,
    ) -> Option<String> {
        self.project(project_name)?
            .find_channel_id(agent_name, instance_id)
    }

    /// Project working directory, if recorded
    pub fn project_path(&self, project_name: &str) -> Option<PathBuf> {
        self.project(project_name)
            .and_then(|p| non_blank(p.project_path.as_deref()))
            .map(PathBuf::from)
    }
}

impl ProjectState {
    /// Instance with the given id
    pub fn instance(&self, instance_id: &str) -> Option<&AgentInstance> {
        self.instances
            .iter()
            .find(|i| i.instance_id.trim() == instance_id)
    }

    /// Instances of an agent, ordered by instance id
    pub fn instances_of(&self, agent_name: &str) -> Vec<&AgentInstance> {
        let mut instances: Vec<&AgentInstance> = self
            .instances
            .iter()
            .filter(|i| i.agent_name.trim() == agent_name)
            .collect();
        instances.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        instances
    }

    /// Recorded window of the agent's primary instance: the lowest instance
    /// id among that agent's instances which have a window recorded
    pub fn primary_window(&self, agent_name: &str) -> Option<&str> {
        self.instances_of(agent_name)
            .into_iter()
            .find_map(|i| i.recorded_window())
    }

    /// Legacy per-agent window, if non-empty
    pub fn legacy_window(&self, agent_name: &str) -> Option<&str> {
        non_blank(self.tmux_windows.get(agent_name).map(String::as_str))
    }

    pub fn find_channel_id(&self, agent_name: &str, instance_id: Option<&str>) -> Option<String> {
        if let Some(channel) = instance_id
            .and_then(|id| self.instance(id))
            .and_then(|i| non_blank(i.channel_id.as_deref()))
        {
            return Some(channel.to_string());
        }

        if let Some(channel) = self
            .instances_of(agent_name)
            .into_iter()
            .find_map(|i| non_blank(i.channel_id.as_deref()))
        {
            return Some(channel.to_string());
        }

        self.discord_channels
            .get(agent_name)
            .and_then(|ch| non_blank(ch.as_deref()))
            .map(str::to_string)
    }
}

impl AgentInstance {
    /// Recorded window, if non-empty. Once recorded it is authoritative.
    pub fn recorded_window(&self) -> Option<&str> {
        non_blank(self.tmux_window.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(
        id: &str,
        agent: &str,
        window: Option<&str>,
        channel: Option<&str>,
    ) -> AgentInstance {
        AgentInstance {
            instance_id: id.to_string(),
            agent_name: agent.to_string(),
            tmux_window: window.map(str::to_string),
            channel_id: channel.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_list_instances() {
        let raw = r#"{
            "projects": {
                "demo": {
                    "projectName": "demo",
                    "projectPath": "/work/demo",
                    "tmuxSession": "agent-bridge",
                    "tmuxWindows": { "claude": "demo-claude" },
                    "instances": [
                        {
                            "instanceId": "claude",
                            "agentName": "claude",
                            "tmuxWindow": "demo-claude"
                        },
                        {
                            "instanceId": "claude-2",
                            "agentType": "claude",
                            "discordChannelId": "ch-2"
                        }
                    ]
                }
            }
        }"#;
        let state: BridgeState = serde_json::from_str(raw).unwrap();
        let project = state.project("demo").unwrap();
        assert_eq!(project.instances.len(), 2);
        assert_eq!(project.instance("claude-2").unwrap().agent_name, "claude");
        assert_eq!(
            project.instance("claude-2").unwrap().channel_id.as_deref(),
            Some("ch-2")
        );
        assert_eq!(state.project_path("demo"), Some(PathBuf::from("/work/demo")));
    }

    #[test]
    fn test_parse_map_instances() {
        let raw = r#"{
            "projects": {
                "demo": {
                    "instances": {
                        "codex": { "agentType": "codex", "channelId": "ch-9" }
                    }
                }
            }
        }"#;
        let state: BridgeState = serde_json::from_str(raw).unwrap();
        let project = state.project("demo").unwrap();
        assert_eq!(project.instances[0].instance_id, "codex");
        assert_eq!(state.find_channel_id("demo", "codex", None).as_deref(), Some("ch-9"));
    }

    #[test]
    fn test_try_load_missing_and_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("state.json");
        assert!(BridgeState::try_load(&missing).unwrap().projects.is_empty());

        std::fs::write(&missing, "{ not json").unwrap();
        assert!(matches!(BridgeState::try_load(&missing), Err(Error::State(_))));
        assert!(BridgeState::load(&missing).projects.is_empty());
    }

    #[test]
    fn test_try_load_fills_project_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"projects":{"demo":{"tmuxSession":"s"}}}"#).unwrap();
        let state = BridgeState::try_load(&path).unwrap();
        assert_eq!(state.project("demo").unwrap().project_name, "demo");
    }

    #[test]
    fn test_primary_window_is_lowest_recorded_instance() {
        let project = ProjectState {
            instances: vec![
                instance("claude-3", "claude", Some("w3"), None),
                instance("claude", "claude", None, None),
                instance("claude-2", "claude", Some("w2"), None),
                instance("codex", "codex", Some("wc"), None),
            ],
            ..ProjectState::default()
        };
        assert_eq!(project.primary_window("claude"), Some("w2"));
        assert_eq!(project.primary_window("codex"), Some("wc"));
        assert_eq!(project.primary_window("gemini"), None);
    }

    #[test]
    fn test_channel_precedence() {
        let project = ProjectState {
            instances: vec![
                instance("claude-2", "claude", None, Some("ch-2")),
                instance("claude", "claude", None, Some("ch-1")),
            ],
            discord_channels: HashMap::from([("codex".to_string(), Some("legacy".to_string()))]),
            ..ProjectState::default()
        };
        assert_eq!(project.find_channel_id("claude", Some("claude-2")).as_deref(), Some("ch-2"));
        assert_eq!(project.find_channel_id("claude", None).as_deref(), Some("ch-1"));
        assert_eq!(project.find_channel_id("codex", None).as_deref(), Some("legacy"));
        assert_eq!(project.find_channel_id("gemini", None), None);
    }

    #[test]
    fn test_blank_legacy_window_ignored() {
        let project = ProjectState {
            tmux_windows: HashMap::from([("claude".to_string(), "  ".to_string())]),
            ..ProjectState::default()
        };
        assert_eq!(project.legacy_window("claude"), None);
    }
}
