//! Application-level errors (wraps domain errors)

use itertools::Itertools;
use thiserror::Error;

use crate::domain::{DomainError, RuntimeKind, Version};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no container runtime found (searched: {})", .searched.iter().join(", "))]
    RuntimeNotFound { searched: Vec<String> },

    #[error("no compose tool available for {runtime}: {message}")]
    ComposeUnavailable {
        runtime: RuntimeKind,
        message: String,
    },

    #[error("{tool} {found} is too old, {required} or newer is required")]
    ComposeTooOld {
        tool: String,
        found: Version,
        required: Version,
    },

    #[error("{runtime} is installed but not reachable: {message}")]
    RuntimeUnreachable {
        runtime: RuntimeKind,
        message: String,
    },

    #[error("`{command}` failed with {}", .code.map(|c| format!("exit code {c}")).unwrap_or_else(|| "a signal".into()))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("aborted: {0}")]
    Declined(String),

    #[error("stack is not configured (missing: {})", .missing.iter().join(", "))]
    NotConfigured { missing: Vec<String> },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
