//! Remote target parsing
//!
//! `host:port` is ambiguous next to IPv6 literals and other multi-colon
//! inputs, so a port is only split off when exactly one colon is present and
//! the suffix is a valid port. Anything else is kept whole as the host spec.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// A resolved ssh destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Host spec handed to ssh as-is (`host`, `user@host`, ...)
    pub host_spec: String,
    /// Port, always within 1..=65535
    pub port: Option<u16>,
    /// Identity file, never blank
    pub identity_file: Option<String>,
}

fn host_port_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+):(\d{1,5})$").expect("valid host:port regex"))
}

/// Accept a port only when it is within 1..=65535.
pub(crate) fn valid_port(port: i64) -> Option<u16> {
    u16::try_from(port).ok().filter(|p| *p != 0)
}

impl RemoteTarget {
    /// Resolve a raw target string. An explicit port always wins over a
    /// `:port` suffix; an invalid explicit port is dropped silently.
    ///
    /// A target starting with `-` would be read by ssh as an option and is
    /// rejected.
    pub fn resolve(
        raw: &str,
        explicit_port: Option<i64>,
        identity: Option<&str>,
    ) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Config("ssh target cannot be empty".to_string()));
        }
        if trimmed.starts_with('-') {
            return Err(Error::Config(format!(
                "ssh target {:?} must not start with '-'",
                trimmed
            )));
        }

        let identity_file = identity
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .map(str::to_string);

        if let Some(port) = explicit_port {
            return Ok(Self {
                host_spec: trimmed.to_string(),
                port: valid_port(port),
                identity_file,
            });
        }

        let (host_spec, port) = split_host_port(trimmed);
        Ok(Self {
            host_spec,
            port,
            identity_file,
        })
    }

    /// `host` or `host:port`, for logs
    pub fn display_name(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host_spec, port),
            None => self.host_spec.clone(),
        }
    }
}

fn split_host_port(target: &str) -> (String, Option<u16>) {
    if target.matches(':').count() != 1 {
        return (target.to_string(), None);
    }

    let Some(caps) = host_port_pattern().captures(target) else {
        return (target.to_string(), None);
    };

    let port = caps[2].parse::<i64>().ok().and_then(valid_port);
    match port {
        Some(port) => (caps[1].to_string(), Some(port)),
        None => (target.to_string(), None),
    }
}
