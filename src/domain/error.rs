//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent invalid values or malformed input.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown container runtime: {0} (expected docker or podman)")]
    UnknownRuntime(String),

    #[error("unknown {kind} backend: {name} (expected one of: {expected})")]
    UnknownBackend {
        kind: &'static str,
        name: String,
        expected: String,
    },

    #[error("invalid version string: {0}")]
    InvalidVersion(String),

    #[error("invalid env file line {line_no}: {message}")]
    InvalidEnvLine { line_no: usize, message: String },

    #[error("invalid env key: {0}")]
    InvalidKey(String),
}
