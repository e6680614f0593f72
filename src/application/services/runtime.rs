//! Container runtime and compose tool detection
//!
//! Nothing here runs containers; it only asks the runtime binaries about
//! themselves (`--version`, `compose version`, `info`).

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{ComposeTool, RuntimeKind, Version};
use crate::infrastructure::traits::CommandRunner;

/// Runtime detection service.
pub struct RuntimeService {
    cmd: Arc<dyn CommandRunner>,
    settings: Arc<Settings>,
}

impl RuntimeService {
    pub fn new(cmd: Arc<dyn CommandRunner>, settings: Arc<Settings>) -> Self {
        Self { cmd, settings }
    }

    fn answers(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.cmd.run(program, args) {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => {
                debug!(
                    "{} {:?} exited with {:?}: {}",
                    program,
                    args,
                    out.status.code(),
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                None
            }
            Err(e) => {
                debug!("{} {:?} could not be started: {}", program, args, e);
                None
            }
        }
    }

    /// Runtimes whose binary answers `--version`, in autodetection order.
    pub fn installed(&self) -> Vec<RuntimeKind> {
        RuntimeKind::ALL
            .into_iter()
            .filter(|rt| self.answers(rt.binary(), &["--version"]).is_some())
            .collect()
    }

    /// Pick the runtime to use.
    ///
    /// A preferred runtime must be installed; there is no silent fallback to
    /// the other one.
    #[instrument(skip(self))]
    pub fn detect(&self, preferred: Option<RuntimeKind>) -> ApplicationResult<RuntimeKind> {
        if let Some(rt) = preferred {
            return if self.answers(rt.binary(), &["--version"]).is_some() {
                Ok(rt)
            } else {
                Err(ApplicationError::RuntimeNotFound {
                    searched: vec![rt.binary().to_string()],
                })
            };
        }

        self.installed()
            .into_iter()
            .next()
            .ok_or_else(|| ApplicationError::RuntimeNotFound {
                searched: RuntimeKind::ALL
                    .iter()
                    .map(|rt| rt.binary().to_string())
                    .collect(),
            })
    }

    /// Find a compose entry point for the runtime and check its version.
    ///
    /// Tries the plugin form (`docker compose`) before the standalone binary
    /// (`docker-compose`).
    #[instrument(skip(self))]
    pub fn compose_tool(&self, runtime: RuntimeKind) -> ApplicationResult<ComposeTool> {
        let candidates: [(&str, &[&str]); 2] = [
            (runtime.binary(), &["compose"]),
            (runtime.standalone_compose(), &[]),
        ];

        let mut tried = Vec::new();
        for (program, base) in candidates {
            let mut args: Vec<&str> = base.to_vec();
            args.push("version");
            tried.push(args_display(program, base));

            let Some(stdout) = self.answers(program, &args) else {
                continue;
            };
            let Some(version) = Version::find_in(&stdout) else {
                debug!("{} printed no version: {}", program, stdout.trim());
                continue;
            };

            let tool = ComposeTool {
                runtime,
                program: program.to_string(),
                base_args: base.iter().map(|s| s.to_string()).collect(),
                version,
            };
            let required = self.settings.min_compose_version(runtime)?;
            if version < required {
                return Err(ApplicationError::ComposeTooOld {
                    tool: tool.display_name(),
                    found: version,
                    required,
                });
            }
            info!("using {} {}", tool.display_name(), version);
            return Ok(tool);
        }

        Err(ApplicationError::ComposeUnavailable {
            runtime,
            message: format!("tried {}", tried.join(", ")),
        })
    }

    /// `<runtime> info` must succeed, i.e. the daemon/machine is up.
    #[instrument(skip(self))]
    pub fn check_connectivity(&self, runtime: RuntimeKind) -> ApplicationResult<()> {
        let unreachable = |message: String| ApplicationError::RuntimeUnreachable { runtime, message };
        match self.cmd.run(runtime.binary(), &["info"]) {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
                Err(unreachable(if stderr.is_empty() {
                    format!("`{runtime} info` exited with {:?}", out.status.code())
                } else {
                    stderr
                }))
            }
            Err(e) => Err(unreachable(e.to_string())),
        }
    }

    /// Detect, check the compose version and connectivity in one go.
    pub fn resolve(&self, preferred: Option<RuntimeKind>) -> ApplicationResult<ComposeTool> {
        let runtime = self.detect(preferred)?;
        let tool = self.compose_tool(runtime)?;
        self.check_connectivity(runtime)?;
        Ok(tool)
    }
}

fn args_display(program: &str, base: &[&str]) -> String {
    std::iter::once(program)
        .chain(base.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
