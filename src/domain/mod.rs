//! Domain layer: runtimes, provider backends and the env file model
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod backend;
pub mod dotenv;
pub mod error;
pub mod runtime;
pub mod stack;

pub use backend::{
    all_provider_keys, combined_fields, mask_secret, Backend, EmbeddingBackend, FieldDefault,
    LlmBackend, ProviderField,
};
pub use dotenv::{is_valid_key, EnvFile};
pub use error::DomainError;
pub use runtime::{ComposeTool, RuntimeKind, Version};
pub use stack::{config_status, ConfigStatus, StackSelection, RUNTIME_KEY};
