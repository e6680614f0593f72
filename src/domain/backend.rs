//! LLM and embedding provider backends and the credentials each one needs

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::domain::{DomainError, RuntimeKind};

/// Default value of a provider field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    None,
    Value(&'static str),
    /// `http://<runtime host gateway>:<port>`
    HostUrl { port: u16 },
}

impl FieldDefault {
    pub fn resolve(&self, runtime: RuntimeKind) -> Option<String> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Value(v) => Some((*v).to_string()),
            FieldDefault::HostUrl { port } => {
                Some(format!("http://{}:{}", runtime.host_gateway(), port))
            }
        }
    }
}

/// One credential or setting a backend needs in the env file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderField {
    pub key: &'static str,
    pub label: &'static str,
    pub secret: bool,
    pub default: FieldDefault,
}

const fn field(key: &'static str, label: &'static str) -> ProviderField {
    ProviderField {
        key,
        label,
        secret: false,
        default: FieldDefault::None,
    }
}

const fn secret(key: &'static str, label: &'static str) -> ProviderField {
    ProviderField {
        key,
        label,
        secret: true,
        default: FieldDefault::None,
    }
}

const fn with_default(
    key: &'static str,
    label: &'static str,
    default: FieldDefault,
) -> ProviderField {
    ProviderField {
        key,
        label,
        secret: false,
        default,
    }
}

const OLLAMA_URL: ProviderField = with_default(
    "OLLAMA_BASE_URL",
    "Ollama base URL",
    FieldDefault::HostUrl { port: 11434 },
);
const OPENAI_KEY: ProviderField = secret("OPENAI_API_KEY", "OpenAI API key");
const AZURE_KEY: ProviderField = secret("AZURE_OPENAI_API_KEY", "Azure OpenAI API key");
const AZURE_ENDPOINT: ProviderField = field(
    "AZURE_OPENAI_ENDPOINT",
    "Azure OpenAI endpoint (https://<resource>.openai.azure.com)",
);
const AZURE_API_VERSION: ProviderField = with_default(
    "AZURE_OPENAI_API_VERSION",
    "Azure OpenAI API version",
    FieldDefault::Value("2024-06-01"),
);

/// A selectable provider family (LLM or embedding).
pub trait Backend: Copy + Eq + fmt::Display + FromStr<Err = DomainError> + 'static {
    /// Env file key that stores the selection.
    const ENV_KEY: &'static str;
    /// Human readable family name used in prompts.
    const KIND: &'static str;

    fn all() -> &'static [Self];
    fn name(&self) -> &'static str;
    fn label(&self) -> &'static str;
    fn fields(&self) -> &'static [ProviderField];
}

fn parse_backend<B: Backend>(s: &str) -> Result<B, DomainError> {
    let wanted = s.trim().to_ascii_lowercase();
    B::all()
        .iter()
        .copied()
        .find(|b| b.name() == wanted)
        .ok_or_else(|| DomainError::UnknownBackend {
            kind: B::KIND,
            name: s.trim().to_string(),
            expected: B::all().iter().map(|b| b.name()).join(", "),
        })
}

/// Chat/completion model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmBackend {
    OpenAi,
    Azure,
    Ollama,
    OpenAiCompatible,
}

impl Backend for LlmBackend {
    const ENV_KEY: &'static str = "LLM_BACKEND";
    const KIND: &'static str = "LLM";

    fn all() -> &'static [Self] {
        &[
            LlmBackend::OpenAi,
            LlmBackend::Azure,
            LlmBackend::Ollama,
            LlmBackend::OpenAiCompatible,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "openai",
            LlmBackend::Azure => "azure",
            LlmBackend::Ollama => "ollama",
            LlmBackend::OpenAiCompatible => "openai-compatible",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "OpenAI",
            LlmBackend::Azure => "Azure OpenAI",
            LlmBackend::Ollama => "Ollama (local)",
            LlmBackend::OpenAiCompatible => "OpenAI-compatible server (vLLM, LM Studio, ...)",
        }
    }

    fn fields(&self) -> &'static [ProviderField] {
        const OPENAI: &[ProviderField] = &[
            OPENAI_KEY,
            with_default("OPENAI_MODEL", "OpenAI model", FieldDefault::Value("gpt-4o-mini")),
        ];
        const AZURE: &[ProviderField] = &[
            AZURE_KEY,
            AZURE_ENDPOINT,
            AZURE_API_VERSION,
            field("AZURE_OPENAI_DEPLOYMENT", "Azure chat deployment name"),
        ];
        const OLLAMA: &[ProviderField] = &[
            OLLAMA_URL,
            with_default("OLLAMA_MODEL", "Ollama model", FieldDefault::Value("llama3.1")),
        ];
        const COMPATIBLE: &[ProviderField] = &[
            field("OPENAI_COMPATIBLE_BASE_URL", "Server base URL (…/v1)"),
            secret("OPENAI_COMPATIBLE_API_KEY", "Server API key"),
            field("OPENAI_COMPATIBLE_MODEL", "Model name"),
        ];
        match self {
            LlmBackend::OpenAi => OPENAI,
            LlmBackend::Azure => AZURE,
            LlmBackend::Ollama => OLLAMA,
            LlmBackend::OpenAiCompatible => COMPATIBLE,
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LlmBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_backend(s)
    }
}

/// Embedding model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingBackend {
    OpenAi,
    Azure,
    Ollama,
}

impl Backend for EmbeddingBackend {
    const ENV_KEY: &'static str = "EMBEDDING_BACKEND";
    const KIND: &'static str = "embedding";

    fn all() -> &'static [Self] {
        &[
            EmbeddingBackend::OpenAi,
            EmbeddingBackend::Azure,
            EmbeddingBackend::Ollama,
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            EmbeddingBackend::OpenAi => "openai",
            EmbeddingBackend::Azure => "azure",
            EmbeddingBackend::Ollama => "ollama",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            EmbeddingBackend::OpenAi => "OpenAI",
            EmbeddingBackend::Azure => "Azure OpenAI",
            EmbeddingBackend::Ollama => "Ollama (local)",
        }
    }

    fn fields(&self) -> &'static [ProviderField] {
        const OPENAI: &[ProviderField] = &[
            OPENAI_KEY,
            with_default(
                "OPENAI_EMBEDDING_MODEL",
                "OpenAI embedding model",
                FieldDefault::Value("text-embedding-3-small"),
            ),
        ];
        const AZURE: &[ProviderField] = &[
            AZURE_KEY,
            AZURE_ENDPOINT,
            AZURE_API_VERSION,
            field(
                "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
                "Azure embedding deployment name",
            ),
        ];
        const OLLAMA: &[ProviderField] = &[
            OLLAMA_URL,
            with_default(
                "OLLAMA_EMBEDDING_MODEL",
                "Ollama embedding model",
                FieldDefault::Value("nomic-embed-text"),
            ),
        ];
        match self {
            EmbeddingBackend::OpenAi => OPENAI,
            EmbeddingBackend::Azure => AZURE,
            EmbeddingBackend::Ollama => OLLAMA,
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmbeddingBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_backend(s)
    }
}

/// Fields of both backends, first occurrence wins for shared keys.
pub fn combined_fields(llm: LlmBackend, embedding: EmbeddingBackend) -> Vec<ProviderField> {
    llm.fields()
        .iter()
        .chain(embedding.fields())
        .copied()
        .unique_by(|f| f.key)
        .collect()
}

/// Every key any backend may write; used to pick provider values out of the process env.
pub fn all_provider_keys() -> Vec<&'static str> {
    LlmBackend::all()
        .iter()
        .flat_map(|b| b.fields())
        .chain(EmbeddingBackend::all().iter().flat_map(|b| b.fields()))
        .map(|f| f.key)
        .unique()
        .collect()
}

/// Show only the tail of a secret: `****abcd`.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_shared_key_when_combining_then_field_appears_once() {
        let fields = combined_fields(LlmBackend::OpenAi, EmbeddingBackend::OpenAi);
        let keys: Vec<_> = fields.iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec!["OPENAI_API_KEY", "OPENAI_MODEL", "OPENAI_EMBEDDING_MODEL"]
        );
    }

    #[test]
    fn given_host_url_default_when_resolved_then_uses_runtime_gateway() {
        let d = FieldDefault::HostUrl { port: 11434 };
        assert_eq!(
            d.resolve(RuntimeKind::Docker).unwrap(),
            "http://host.docker.internal:11434"
        );
        assert_eq!(
            d.resolve(RuntimeKind::Podman).unwrap(),
            "http://host.containers.internal:11434"
        );
    }

    #[test]
    fn given_unknown_backend_when_parse_then_lists_expected() {
        let err = "bedrock".parse::<EmbeddingBackend>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown embedding backend: bedrock (expected one of: openai, azure, ollama)"
        );
    }

    #[test]
    fn given_backend_names_when_parse_then_roundtrip_through_display() {
        for b in LlmBackend::all() {
            assert_eq!(b.to_string().parse::<LlmBackend>().unwrap(), *b);
        }
    }

    #[test]
    fn given_secrets_when_masked_then_only_tail_is_visible() {
        assert_eq!(mask_secret("sk-1234567890abcd"), "****abcd");
        assert_eq!(mask_secret("short"), "****");
    }

    #[test]
    fn given_all_backends_when_listing_keys_then_no_duplicates() {
        let keys = all_provider_keys();
        assert!(keys.contains(&"OLLAMA_BASE_URL"));
        assert_eq!(
            keys.iter().filter(|k| **k == "AZURE_OPENAI_API_KEY").count(),
            1
        );
    }
}
