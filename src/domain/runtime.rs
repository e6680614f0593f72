//! Container runtimes, compose tools and their versions

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A container engine able to run the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Docker,
    Podman,
}

impl RuntimeKind {
    /// All supported runtimes in autodetection order.
    pub const ALL: [RuntimeKind; 2] = [RuntimeKind::Docker, RuntimeKind::Podman];

    /// Name of the runtime's CLI binary.
    pub fn binary(&self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Podman => "podman",
        }
    }

    /// Name of the standalone compose binary shipped for older installs.
    pub fn standalone_compose(&self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker-compose",
            RuntimeKind::Podman => "podman-compose",
        }
    }

    /// Hostname under which containers reach services on the host.
    pub fn host_gateway(&self) -> &'static str {
        match self {
            RuntimeKind::Docker => "host.docker.internal",
            RuntimeKind::Podman => "host.containers.internal",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

impl FromStr for RuntimeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(RuntimeKind::Docker),
            "podman" => Ok(RuntimeKind::Podman),
            other => Err(DomainError::UnknownRuntime(other.to_string())),
        }
    }
}

/// Semantic version as reported by `compose version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("version regex is valid")
    })
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first `MAJOR.MINOR[.PATCH]` found in free-form tool output.
    ///
    /// Handles `Docker Compose version v2.24.5`, `podman-compose version 1.0.6`
    /// and bare `2.29.1-desktop.1`.
    pub fn find_in(text: &str) -> Option<Self> {
        let caps = version_regex().captures(text)?;
        let num = |i: usize| -> Option<u64> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        Some(Self::new(num(1)?, num(2)?, num(3)?))
    }
}

impl FromStr for Version {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        match Self::find_in(trimmed) {
            Some(v) if trimmed.starts_with(|c: char| c.is_ascii_digit()) => Ok(v),
            _ => Err(DomainError::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A working compose entry point for a runtime.
///
/// Either the plugin form (`docker compose`) or a standalone binary
/// (`docker-compose`), together with the version it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeTool {
    pub runtime: RuntimeKind,
    pub program: String,
    pub base_args: Vec<String>,
    pub version: Version,
}

impl ComposeTool {
    /// Full argument vector for a compose invocation (without the program).
    pub fn args_for<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args
            .iter()
            .cloned()
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    /// Human readable command prefix, e.g. `docker compose`.
    pub fn display_name(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
