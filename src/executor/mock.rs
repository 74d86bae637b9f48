//! Recording executor for tests

use super::{CommandExecutor, ExecOutput};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies to commands from a rule list and records every command it saw.
///
/// A rule matches when the command contains its needle; the first queued
/// reply for a matching rule is consumed, the last one is sticky.
pub(crate) struct MockExecutor {
    platform: Option<String>,
    rules: Mutex<Vec<(String, VecDeque<ExecOutput>)>>,
    commands: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub(crate) fn new(platform: Option<&str>) -> Self {
        Self {
            platform: platform.map(str::to_string),
            rules: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on(self, needle: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        let reply = ExecOutput {
            exit_code: Some(exit_code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        };
        {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter_mut().find(|(n, _)| n == needle) {
                Some((_, replies)) => replies.push_back(reply),
                None => rules.push((needle.to_string(), VecDeque::from([reply]))),
            }
        }
        self
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn reply(&self, command: &str) -> ExecOutput {
        self.commands.lock().unwrap().push(command.to_string());
        let mut rules = self.rules.lock().unwrap();
        for (needle, replies) in rules.iter_mut() {
            if command.contains(needle.as_str()) {
                if replies.len() > 1 {
                    return replies.pop_front().unwrap();
                }
                return replies.front().cloned().unwrap();
            }
        }
        ExecOutput {
            exit_code: Some(0),
            ..ExecOutput::default()
        }
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    fn platform_hint(&self) -> Option<String> {
        self.platform.clone()
    }

    async fn execute(&self, command: &str) -> Result<ExecOutput> {
        Ok(self.reply(command))
    }

    async fn execute_void(&self, command: &str) -> Result<Option<i32>> {
        Ok(self.reply(command).exit_code)
    }
}
