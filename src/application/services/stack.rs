//! Stack lifecycle: thin wrappers around the compose tool

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::ComposeTool;
use crate::infrastructure::traits::CommandRunner;

/// Options for `logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub follow: bool,
    /// Falls back to `Settings::log_tail`
    pub tail: Option<u32>,
    pub services: Vec<String>,
}

/// Stack lifecycle service.
pub struct StackService {
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
    project_dir: PathBuf,
}

impl StackService {
    pub fn new(cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>, project_dir: &Path) -> Self {
        Self {
            cmd,
            settings,
            project_dir: project_dir.to_path_buf(),
        }
    }

    /// Full argument vector for a compose verb, without the program name.
    ///
    /// `<base args> --env-file <env> [-f <file>]... [-p <project>] <verb...>`
    pub fn compose_args(&self, tool: &ComposeTool, verb: &[String]) -> Vec<String> {
        let mut args = vec![
            "--env-file".to_string(),
            self.settings
                .env_path(&self.project_dir)
                .to_string_lossy()
                .into_owned(),
        ];
        for file in self.settings.compose_paths(&self.project_dir) {
            args.push("-f".into());
            args.push(file.to_string_lossy().into_owned());
        }
        if let Some(name) = &self.settings.project_name {
            args.push("-p".into());
            args.push(name.clone());
        }
        args.extend(verb.iter().cloned());
        tool.args_for(args)
    }

    fn compose(&self, tool: &ComposeTool, verb: &[String]) -> ApplicationResult<()> {
        let args = self.compose_args(tool, verb);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = format!("{} {}", tool.display_name(), verb.join(" "));
        debug!("running {} {}", tool.program, args.join(" "));

        let status = self
            .cmd
            .run_attached(&tool.program, &arg_refs)
            .with_context(&format!("spawn {}", tool.program))?;

        if status.success() {
            Ok(())
        } else {
            Err(ApplicationError::CommandFailed {
                command,
                code: status.code(),
            })
        }
    }

    /// Bring the whole stack up in the background.
    #[instrument(skip(self, tool))]
    pub fn start(&self, tool: &ComposeTool, build: bool) -> ApplicationResult<()> {
        let mut verb = vec!["up".to_string(), "-d".to_string()];
        if build {
            verb.push("--build".into());
        }
        self.compose(tool, &verb)
    }

    /// Bring up only the infrastructure services (databases, caches, ...).
    #[instrument(skip(self, tool))]
    pub fn start_infra(&self, tool: &ComposeTool) -> ApplicationResult<()> {
        if self.settings.infra_services.is_empty() {
            return Err(ApplicationError::Config {
                message: "infra_services is empty, nothing to start".into(),
            });
        }
        let verb: Vec<String> = ["up", "-d"]
            .iter()
            .map(|s| s.to_string())
            .chain(self.settings.infra_services.iter().cloned())
            .collect();
        self.compose(tool, &verb)
    }

    #[instrument(skip(self, tool))]
    pub fn stop(&self, tool: &ComposeTool) -> ApplicationResult<()> {
        self.compose(tool, &["down".to_string()])
    }

    /// Remove containers, networks and volumes of the stack.
    #[instrument(skip(self, tool))]
    pub fn clean(&self, tool: &ComposeTool) -> ApplicationResult<()> {
        let verb = ["down", "--volumes", "--remove-orphans"].map(String::from);
        self.compose(tool, &verb)
    }

    #[instrument(skip(self, tool))]
    pub fn logs(&self, tool: &ComposeTool, options: &LogOptions) -> ApplicationResult<()> {
        let tail = options.tail.unwrap_or(self.settings.log_tail);
        let mut verb = vec!["logs".to_string(), "--tail".to_string(), tail.to_string()];
        if options.follow {
            verb.push("-f".into());
        }
        verb.extend(options.services.iter().cloned());
        self.compose(tool, &verb)
    }
}
