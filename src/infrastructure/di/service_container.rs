//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::{RuntimeService, SetupService, StackService};
use crate::config::Settings;
use crate::infrastructure::traits::{
    CommandRunner, FileSystem, MenuSelector, Prompter, RealCommandRunner, RealFileSystem,
    Selector, SkimSelector, TerminalPrompter,
};

/// Container holding the I/O implementations shared by all services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Directory holding the compose files and the env file
    pub project_dir: PathBuf,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Question/answer abstraction
    pub prompter: Arc<dyn Prompter>,

    /// Backend selection abstraction
    pub selector: Arc<dyn Selector>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// Uses skim for selection when stdin is a terminal and a numbered menu otherwise.
    pub fn new(settings: Settings, project_dir: &Path) -> Self {
        let selector: Arc<dyn Selector> = if std::io::stdin().is_terminal() {
            Arc::new(SkimSelector)
        } else {
            Arc::new(MenuSelector)
        };
        Self::with_deps(
            settings,
            project_dir,
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
            Arc::new(TerminalPrompter),
            selector,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        project_dir: &Path,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        prompter: Arc<dyn Prompter>,
        selector: Arc<dyn Selector>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            project_dir: project_dir.to_path_buf(),
            fs,
            cmd,
            prompter,
            selector,
        }
    }

    pub fn env_path(&self) -> PathBuf {
        self.settings.env_path(&self.project_dir)
    }

    pub fn runtime_service(&self) -> RuntimeService {
        RuntimeService::new(self.cmd.clone(), self.settings.clone())
    }

    pub fn setup_service(&self) -> SetupService {
        SetupService::new(self.fs.clone(), self.prompter.clone(), self.selector.clone())
    }

    pub fn stack_service(&self) -> StackService {
        StackService::new(self.cmd.clone(), self.settings.clone(), &self.project_dir)
    }
}
