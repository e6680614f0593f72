//! Interactive setup: backend selection and credential collection into the env file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{
    combined_fields, config_status, mask_secret, Backend, ConfigStatus, EmbeddingBackend, EnvFile,
    LlmBackend, ProviderField, RuntimeKind, StackSelection, RUNTIME_KEY,
};
use crate::infrastructure::traits::{FileSystem, Prompter, SelectionItem, Selector};

/// Attempts for a required value before setup gives up.
const MAX_ATTEMPTS: usize = 3;

/// Inputs for one setup run.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub runtime: RuntimeKind,
    /// Preselected LLM backend (flag or `LLM_BACKEND`); skips the selection
    pub llm: Option<LlmBackend>,
    /// Preselected embedding backend (flag or `EMBEDDING_BACKEND`)
    pub embedding: Option<EmbeddingBackend>,
    pub interactive: bool,
    /// Provider values taken from the process environment
    pub overrides: BTreeMap<String, String>,
}

impl SetupOptions {
    pub fn interactive(runtime: RuntimeKind) -> Self {
        Self {
            runtime,
            llm: None,
            embedding: None,
            interactive: true,
            overrides: BTreeMap::new(),
        }
    }
}

/// Result of a completed setup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub path: PathBuf,
    pub selection: StackSelection,
    /// Keys whose value differs from what the file held before
    pub changed: Vec<String>,
    pub created: bool,
}

/// Setup service.
pub struct SetupService {
    fs: Arc<dyn FileSystem>,
    prompter: Arc<dyn Prompter>,
    selector: Arc<dyn Selector>,
}

impl SetupService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        prompter: Arc<dyn Prompter>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        Self {
            fs,
            prompter,
            selector,
        }
    }

    /// Parse the env file; a missing file is an empty configuration.
    pub fn load(&self, path: &Path) -> ApplicationResult<EnvFile> {
        if !self.fs.exists(path) {
            debug!("no env file at {}", path.display());
            return Ok(EnvFile::new());
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read env file", path)?;
        Ok(EnvFile::parse(&content)?)
    }

    pub fn status(&self, path: &Path) -> ApplicationResult<ConfigStatus> {
        Ok(config_status(&self.load(path)?))
    }

    /// Run the prompt/answer flow and write the env file.
    #[instrument(skip(self, options), fields(runtime = %options.runtime, interactive = options.interactive))]
    pub fn run(&self, path: &Path, options: &SetupOptions) -> ApplicationResult<SetupOutcome> {
        let existing = self.load(path)?;
        let created = !self.fs.exists(path);
        let mut env = existing.clone();

        let (llm, embedding) = if options.interactive {
            (
                self.choose::<LlmBackend>(options.llm, &existing)?,
                self.choose::<EmbeddingBackend>(options.embedding, &existing)?,
            )
        } else {
            let llm = preselected(options.llm, &existing);
            let embedding = preselected(options.embedding, &existing);
            match (llm, embedding) {
                (Some(l), Some(e)) => (l, e),
                _ => {
                    return Err(ApplicationError::NotConfigured {
                        missing: missing_without_selection(llm, embedding, &existing, options),
                    })
                }
            }
        };
        debug!("selected llm={} embedding={}", llm, embedding);

        let mut missing = Vec::new();
        let mut answers = Vec::new();
        for field in combined_fields(llm, embedding) {
            let current = current_value(&field, &existing, options);

            if options.interactive {
                answers.push((field.key, self.ask_field(&field, current)?));
            } else {
                match current {
                    Some(value) => answers.push((field.key, value)),
                    None => missing.push(field.key.to_string()),
                }
            }
        }
        if !missing.is_empty() {
            return Err(ApplicationError::NotConfigured { missing });
        }

        if created {
            env.push_comment(&format!(
                "Generated by stackup setup on {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            ));
            env.push_comment("Re-run `stackup setup` to change these values.");
        }
        env.set(RUNTIME_KEY, options.runtime.to_string())?;
        env.set(LlmBackend::ENV_KEY, llm.name())?;
        env.set(EmbeddingBackend::ENV_KEY, embedding.name())?;
        for (key, value) in answers {
            env.set(key, value)?;
        }

        let changed: Vec<String> = env
            .keys()
            .into_iter()
            .filter(|k| existing.get(k) != env.get(k))
            .map(str::to_string)
            .collect();

        self.save(path, &env)?;
        info!(
            "wrote {} ({} changed keys)",
            path.display(),
            changed.len()
        );

        Ok(SetupOutcome {
            path: path.to_path_buf(),
            selection: StackSelection {
                runtime: options.runtime,
                llm,
                embedding,
            },
            changed,
            created,
        })
    }

    /// Write the env file atomically, creating the parent directory if needed.
    pub fn save(&self, path: &Path, env: &EnvFile) -> ApplicationResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.fs.exists(parent) {
                self.fs
                    .create_dir_all(parent)
                    .with_path_context("create directory", parent)?;
            }
        }
        self.fs
            .write_atomic(path, &env.render())
            .with_path_context("write env file", path)
    }

    /// Interactive backend selection unless preset by flag or env.
    fn choose<B: Backend>(&self, preset: Option<B>, existing: &EnvFile) -> ApplicationResult<B> {
        if let Some(b) = preset {
            return Ok(b);
        }
        let current = stored::<B>(existing);

        // Current selection first so accepting the default keeps it
        let mut ordered: Vec<B> = B::all().to_vec();
        if let Some(cur) = current {
            ordered.retain(|b| *b != cur);
            ordered.insert(0, cur);
        }
        let items: Vec<SelectionItem> = ordered
            .iter()
            .map(|b| SelectionItem {
                display: format!("{:<18} {}", b.name(), b.label()),
                value: b.name().to_string(),
            })
            .collect();

        let selected = self
            .selector
            .select_one(&items, &format!("{} backend> ", B::KIND))
            .map_err(|message| ApplicationError::OperationFailed {
                context: format!("select {} backend", B::KIND),
                source: message.into(),
            })?
            .ok_or_else(|| ApplicationError::Declined(format!("no {} backend selected", B::KIND)))?;

        Ok(selected.value.parse::<B>()?)
    }

    fn ask_field(&self, field: &ProviderField, current: Option<String>) -> ApplicationResult<String> {
        let prompt = match &current {
            Some(v) if field.secret => format!("{} [{}]:", field.label, mask_secret(v)),
            Some(v) => format!("{} [{}]:", field.label, v),
            None => format!("{}:", field.label),
        };

        for attempt in 1..=MAX_ATTEMPTS {
            let answer = self
                .prompter
                .input(&prompt)
                .with_context(&format!("read {}", field.key))?;
            match answer {
                None => break,
                Some(a) if a.is_empty() => {
                    if let Some(c) = &current {
                        return Ok(c.clone());
                    }
                    warn!(
                        "{} is required (attempt {}/{})",
                        field.key, attempt, MAX_ATTEMPTS
                    );
                }
                Some(a) => return Ok(a),
            }
        }

        current.ok_or_else(|| ApplicationError::NotConfigured {
            missing: vec![field.key.to_string()],
        })
    }
}

fn stored<B: Backend>(env: &EnvFile) -> Option<B> {
    env.get(B::ENV_KEY).and_then(|v| v.parse::<B>().ok())
}

fn preselected<B: Backend>(preset: Option<B>, existing: &EnvFile) -> Option<B> {
    preset.or_else(|| stored::<B>(existing))
}

/// Override, then existing file, then the field default.
fn current_value(field: &ProviderField, existing: &EnvFile, options: &SetupOptions) -> Option<String> {
    options
        .overrides
        .get(field.key)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .or_else(|| existing.get_non_empty(field.key).map(str::to_string))
        .or_else(|| field.default.resolve(options.runtime))
}

/// Every missing key when at least one backend could not be determined:
/// the selection keys first, then unfilled fields of the backend that is known.
fn missing_without_selection(
    llm: Option<LlmBackend>,
    embedding: Option<EmbeddingBackend>,
    existing: &EnvFile,
    options: &SetupOptions,
) -> Vec<String> {
    let mut missing = Vec::new();
    if llm.is_none() {
        missing.push(LlmBackend::ENV_KEY.to_string());
    }
    if embedding.is_none() {
        missing.push(EmbeddingBackend::ENV_KEY.to_string());
    }
    let fields: &[ProviderField] = match (llm, embedding) {
        (Some(l), _) => l.fields(),
        (_, Some(e)) => e.fields(),
        _ => &[],
    };
    missing.extend(
        fields
            .iter()
            .filter(|f| current_value(f, existing, options).is_none())
            .map(|f| f.key.to_string()),
    );
    missing
}
