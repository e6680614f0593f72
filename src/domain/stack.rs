//! Stack configuration completeness

use crate::domain::{combined_fields, Backend, EmbeddingBackend, EnvFile, LlmBackend, RuntimeKind};

pub const RUNTIME_KEY: &str = "RUNTIME";

/// The three top-level selections stored in the env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackSelection {
    pub runtime: RuntimeKind,
    pub llm: LlmBackend,
    pub embedding: EmbeddingBackend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Configured(StackSelection),
    Incomplete { missing: Vec<String> },
}

impl ConfigStatus {
    pub fn is_configured(&self) -> bool {
        matches!(self, ConfigStatus::Configured(_))
    }
}

/// Evaluate whether every key needed to start the stack is present.
pub fn config_status(env: &EnvFile) -> ConfigStatus {
    let mut missing = Vec::new();

    let runtime = env.get(RUNTIME_KEY).and_then(|v| v.parse::<RuntimeKind>().ok());
    let llm = env
        .get(LlmBackend::ENV_KEY)
        .and_then(|v| v.parse::<LlmBackend>().ok());
    let embedding = env
        .get(EmbeddingBackend::ENV_KEY)
        .and_then(|v| v.parse::<EmbeddingBackend>().ok());

    if runtime.is_none() {
        missing.push(RUNTIME_KEY.to_string());
    }
    if llm.is_none() {
        missing.push(LlmBackend::ENV_KEY.to_string());
    }
    if embedding.is_none() {
        missing.push(EmbeddingBackend::ENV_KEY.to_string());
    }

    let fields = match (llm, embedding) {
        (Some(l), Some(e)) => combined_fields(l, e),
        (Some(l), None) => l.fields().to_vec(),
        (None, Some(e)) => e.fields().to_vec(),
        (None, None) => Vec::new(),
    };
    missing.extend(
        fields
            .iter()
            .filter(|f| env.get_non_empty(f.key).is_none())
            .map(|f| f.key.to_string()),
    );

    match (runtime, llm, embedding) {
        (Some(runtime), Some(llm), Some(embedding)) if missing.is_empty() => {
            ConfigStatus::Configured(StackSelection {
                runtime,
                llm,
                embedding,
            })
        }
        _ => ConfigStatus::Incomplete { missing },
    }
}
