//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/stackup/stackup.toml`
//! 3. Local config: `<project_dir>/.stackup.toml`
//! 4. Environment variables: `STACKUP_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{RuntimeKind, Version};

pub const DEFAULT_DOCS_URL: &str = "docs/troubleshooting.md";

/// Unified configuration for stackup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Env file written by setup, relative to the project dir
    pub env_file: PathBuf,
    /// Compose files passed with `-f`, relative to the project dir
    pub compose_files: Vec<PathBuf>,
    /// Compose project name (`-p`), compose derives one from the directory if unset
    pub project_name: Option<String>,
    /// Services started by `start:infra`
    pub infra_services: Vec<String>,
    /// Preferred runtime, autodetected if unset
    pub runtime: Option<RuntimeKind>,
    /// Minimum accepted `docker compose` version
    pub min_docker_compose: String,
    /// Minimum accepted `podman compose` version
    pub min_podman_compose: String,
    /// Troubleshooting docs printed with every failure
    pub docs_url: String,
    /// Default `--tail` for logs
    pub log_tail: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            compose_files: vec![PathBuf::from("docker-compose.yml")],
            project_name: None,
            infra_services: vec!["postgres".into(), "redis".into(), "qdrant".into()],
            runtime: None,
            min_docker_compose: "2.20.0".into(),
            min_podman_compose: "1.0.6".into(),
            docs_url: DEFAULT_DOCS_URL.into(),
            log_tail: 100,
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified, inherit").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub env_file: Option<PathBuf>,
    pub compose_files: Option<Vec<PathBuf>>,
    pub project_name: Option<String>,
    pub infra_services: Option<Vec<String>>,
    pub runtime: Option<RuntimeKind>,
    pub min_docker_compose: Option<String>,
    pub min_podman_compose: Option<String>,
    pub docs_url: Option<String>,
    pub log_tail: Option<u32>,
}

/// Get the XDG config directory for stackup.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stackup").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("stackup.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".stackup.toml")
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are appended to base (order kept, no duplicates)
    /// - Items prefixed with `!` remove the corresponding item from the result
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let removed: HashSet<&str> = overlay
            .iter()
            .filter_map(|p| p.strip_prefix('!'))
            .collect();
        let mut seen = HashSet::new();
        base.iter()
            .chain(overlay.iter().filter(|p| !p.starts_with('!')))
            .filter(|item| !removed.contains(item.as_str()))
            .filter(|item| seen.insert(item.as_str()))
            .cloned()
            .collect()
    }

    /// Apply global config onto defaults: every specified value REPLACES.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            env_file: global.env_file.clone().unwrap_or_else(|| self.env_file.clone()),
            compose_files: global
                .compose_files
                .clone()
                .unwrap_or_else(|| self.compose_files.clone()),
            project_name: global.project_name.clone().or_else(|| self.project_name.clone()),
            infra_services: global
                .infra_services
                .clone()
                .unwrap_or_else(|| self.infra_services.clone()),
            runtime: global.runtime.or(self.runtime),
            min_docker_compose: global
                .min_docker_compose
                .clone()
                .unwrap_or_else(|| self.min_docker_compose.clone()),
            min_podman_compose: global
                .min_podman_compose
                .clone()
                .unwrap_or_else(|| self.min_podman_compose.clone()),
            docs_url: global.docs_url.clone().unwrap_or_else(|| self.docs_url.clone()),
            log_tail: global.log_tail.unwrap_or(self.log_tail),
        }
    }

    /// Merge project-local config onto self.
    ///
    /// Same as `apply_global` except `infra_services`, which UNIONS with
    /// negation support so a project can add or drop single services.
    fn merge_with(&self, local: &RawSettings) -> Self {
        let mut merged = self.apply_global(&RawSettings {
            infra_services: None,
            ..local.clone()
        });
        if let Some(services) = &local.infra_services {
            merged.infra_services = Self::merge_array(&self.infra_services, services);
        }
        merged
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: `infra_services` UNION with `!service` negation, others REPLACE
    /// - Any → Env vars: REPLACE
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(project) = project_dir {
            let local_path = local_config_path(project);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply STACKUP_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("STACKUP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("compose_files")
                    .with_list_parse_key("infra_services")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("env_file") {
            settings.env_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("compose_files") {
            settings.compose_files = val.into_iter().map(PathBuf::from).collect();
        }
        if let Ok(val) = config.get_string("project_name") {
            settings.project_name = Some(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("infra_services") {
            settings.infra_services = val;
        }
        if let Ok(val) = config.get_string("runtime") {
            settings.runtime = Some(val.parse().map_err(|e| ApplicationError::Config {
                message: format!("STACKUP_RUNTIME: {e}"),
            })?);
        }
        if let Ok(val) = config.get_string("min_docker_compose") {
            settings.min_docker_compose = val;
        }
        if let Ok(val) = config.get_string("min_podman_compose") {
            settings.min_podman_compose = val;
        }
        if let Ok(val) = config.get_string("docs_url") {
            settings.docs_url = val;
        }
        if let Ok(val) = config.get_int("log_tail") {
            settings.log_tail = u32::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("STACKUP_LOG_TAIL out of range: {val}"),
            })?;
        }

        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        self.env_file = PathBuf::from(expand(&self.env_file.to_string_lossy()));
        self.compose_files = self
            .compose_files
            .iter()
            .map(|p| PathBuf::from(expand(&p.to_string_lossy())))
            .collect();
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        self.min_compose_version(RuntimeKind::Docker)?;
        self.min_compose_version(RuntimeKind::Podman)?;
        if self.compose_files.is_empty() {
            return Err(ApplicationError::Config {
                message: "compose_files must name at least one file".into(),
            });
        }
        Ok(())
    }

    /// Minimum compose version accepted for a runtime.
    pub fn min_compose_version(&self, runtime: RuntimeKind) -> Result<Version, ApplicationError> {
        let raw = match runtime {
            RuntimeKind::Docker => &self.min_docker_compose,
            RuntimeKind::Podman => &self.min_podman_compose,
        };
        raw.parse().map_err(|e| ApplicationError::Config {
            message: format!("min_{runtime}_compose: {e}"),
        })
    }

    /// Absolute env file path for a project.
    pub fn env_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.env_file)
    }

    /// Absolute compose file paths for a project.
    pub fn compose_paths(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.compose_files
            .iter()
            .map(|f| project_dir.join(f))
            .collect()
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# stackup configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/stackup/stackup.toml  (defines your baseline)
#   Local:  <project>/.stackup.toml         (project-specific settings)
#   Env:    STACKUP_* environment variables (explicit overrides)
#
# infra_services in the local config UNIONS with the global list.
# Prefix an entry with "!" to drop an inherited service:
#   infra_services = ["minio", "!redis"]

# Env file written by `stackup setup`
# env_file = ".env"

# Compose files (passed with -f)
# compose_files = ["docker-compose.yml"]

# Compose project name (-p)
# project_name = "mystack"

# Services started by `stackup start:infra`
# infra_services = ["postgres", "redis", "qdrant"]

# Preferred container runtime: "docker" or "podman"
# runtime = "docker"

# Minimum compose versions
# min_docker_compose = "2.20.0"
# min_podman_compose = "1.0.6"

# Troubleshooting link printed on failures
# docs_url = "docs/troubleshooting.md"

# Default number of log lines for `stackup logs`
# log_tail = 100
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Best-effort troubleshooting link, usable when settings failed to load.
pub fn troubleshooting_url(project_dir: Option<&Path>) -> String {
    Settings::load(project_dir)
        .map(|s| s.docs_url)
        .unwrap_or_else(|_| DEFAULT_DOCS_URL.to_string())
}
