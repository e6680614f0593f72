//! Command dispatch: one function per subcommand

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument, warn};

use crate::application::services::{LogOptions, SetupOptions};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, SetupArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{
    all_provider_keys, ConfigStatus, EmbeddingBackend, LlmBackend, RuntimeKind, RUNTIME_KEY,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::SelectionItem;
use crate::infrastructure::InfraError;

/// Resolve the project dir, load settings and run the command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = resolve_project_dir(cli.project_dir.as_deref())?;
    debug!("project_dir: {}", project_dir.display());
    let settings = Settings::load(Some(&project_dir))?;
    let container = ServiceContainer::new(settings, &project_dir);
    run_with(&container, cli)
}

/// Dispatch against an already wired container.
pub fn run_with(c: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    match &cli.command {
        None => cmd_setup(c, cli, &setup_args_from_env()?),
        Some(Commands::Setup(args)) => cmd_setup(c, cli, args),
        Some(Commands::Start { build }) => cmd_start(c, cli, *build),
        Some(Commands::StartInfra) => cmd_start_infra(c, cli),
        Some(Commands::Stop) => cmd_stop(c, cli),
        Some(Commands::Clean { yes }) => cmd_clean(c, cli, *yes),
        Some(Commands::Check) => cmd_check(c, cli),
        Some(Commands::Logs {
            follow,
            tail,
            services,
        }) => cmd_logs(
            c,
            cli,
            LogOptions {
                follow: *follow,
                tail: *tail,
                services: services.clone(),
            },
        ),
        Some(Commands::Config { command }) => cmd_config(c, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "stackup", &mut io::stdout());
            Ok(())
        }
    }
}

fn resolve_project_dir(arg: Option<&Path>) -> CliResult<PathBuf> {
    match arg {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        Some(dir) => Err(CliError::InvalidArgs(format!(
            "project directory does not exist: {}",
            dir.display()
        ))),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e).into()),
    }
}

/// Setup arguments when no subcommand was given (clap only reads env for the subcommand).
fn setup_args_from_env() -> CliResult<SetupArgs> {
    let parse = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    Ok(SetupArgs {
        llm_backend: parse("LLM_BACKEND")
            .map(|v| v.parse::<LlmBackend>())
            .transpose()
            .map_err(|e| CliError::InvalidArgs(format!("LLM_BACKEND: {e}")))?,
        embedding_backend: parse("EMBEDDING_BACKEND")
            .map(|v| v.parse::<EmbeddingBackend>())
            .transpose()
            .map_err(|e| CliError::InvalidArgs(format!("EMBEDDING_BACKEND: {e}")))?,
        ..SetupArgs::default()
    })
}

/// Provider values present in the process environment.
fn provider_overrides() -> BTreeMap<String, String> {
    all_provider_keys()
        .into_iter()
        .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
        .filter(|(_, v)| !v.trim().is_empty())
        .collect()
}

/// `--runtime`/`RUNTIME` > `RUNTIME` in the env file > config file.
///
/// A malformed env file only loses its remembered runtime here; the caller
/// reports it when it reads the file itself.
fn preferred_runtime(c: &ServiceContainer, cli: &Cli) -> Option<RuntimeKind> {
    if cli.runtime.is_some() {
        return cli.runtime;
    }
    let from_file = match c.setup_service().load(&c.env_path()) {
        Ok(env) => env.get(RUNTIME_KEY).and_then(|v| v.parse().ok()),
        Err(e) => {
            warn!("ignoring RUNTIME from env file: {}", e);
            None
        }
    };
    from_file.or(c.settings.runtime)
}

/// Runtime for setup: an explicit or remembered preference wins, otherwise
/// ask when more than one runtime is installed.
fn choose_runtime(c: &ServiceContainer, cli: &Cli, interactive: bool) -> CliResult<RuntimeKind> {
    let svc = c.runtime_service();
    if let Some(rt) = cli.runtime {
        return Ok(svc.detect(Some(rt))?);
    }

    let installed = svc.installed();
    let remembered = preferred_runtime(c, cli).filter(|rt| installed.contains(rt));
    if let Some(rt) = remembered {
        return Ok(rt);
    }
    match installed.as_slice() {
        [] => Err(ApplicationError::RuntimeNotFound {
            searched: RuntimeKind::ALL.iter().map(|rt| rt.to_string()).collect(),
        }
        .into()),
        [only] => Ok(*only),
        [first, ..] if !interactive => Ok(*first),
        several => {
            let items: Vec<SelectionItem> = several
                .iter()
                .map(|rt| SelectionItem {
                    display: rt.to_string(),
                    value: rt.to_string(),
                })
                .collect();
            let picked = c
                .selector
                .select_one(&items, "runtime> ")
                .map_err(CliError::Usage)?
                .ok_or_else(|| ApplicationError::Declined("no runtime selected".into()))?;
            Ok(picked
                .value
                .parse::<RuntimeKind>()
                .map_err(ApplicationError::from)?)
        }
    }
}

#[instrument(skip(c, cli))]
fn cmd_setup(c: &ServiceContainer, cli: &Cli, args: &SetupArgs) -> CliResult<()> {
    output::header("Stack setup");
    let interactive = !args.non_interactive;

    let runtime = choose_runtime(c, cli, interactive)?;
    let runtime_svc = c.runtime_service();
    let tool = runtime_svc.compose_tool(runtime)?;
    output::success_detail(&format!("{} {}", tool.display_name(), tool.version));

    let setup = c.setup_service();
    let env_path = c.env_path();

    let mut reconfigure = true;
    if interactive && !args.reconfigure && setup.status(&env_path)?.is_configured() {
        reconfigure = c
            .prompter
            .confirm(
                &format!("{} is already configured. Reconfigure?", env_path.display()),
                false,
            )
            .map_err(|e| InfraError::io("read answer", e))?;
    }

    if reconfigure {
        let options = SetupOptions {
            runtime,
            llm: args.llm_backend,
            embedding: args.embedding_backend,
            interactive,
            overrides: provider_overrides(),
        };
        let outcome = c.setup_service().run(&env_path, &options)?;
        let label = if outcome.created { "Created" } else { "Updated" };
        output::action(label, &outcome.path.display());
        output::detail(&format!(
            "runtime={} llm={} embedding={}",
            outcome.selection.runtime, outcome.selection.llm, outcome.selection.embedding
        ));
        if !outcome.changed.is_empty() {
            output::detail(&format!("changed: {}", outcome.changed.iter().join(", ")));
        }
    } else {
        output::info("Keeping existing configuration.");
    }

    if args.no_start || !interactive {
        output::info("Run `stackup start` to launch the stack.");
        return Ok(());
    }
    let start_now = c
        .prompter
        .confirm("Start the stack now?", true)
        .map_err(|e| InfraError::io("read answer", e))?;
    if start_now {
        runtime_svc.check_connectivity(runtime)?;
        c.stack_service().start(&tool, false)?;
        output::success("Stack started");
    }
    Ok(())
}

/// Make sure the env file is complete, offering to run setup if it is not.
fn ensure_configured(c: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    let setup = c.setup_service();
    let env_path = c.env_path();
    let missing = match setup.status(&env_path)? {
        ConfigStatus::Configured(_) => return Ok(()),
        ConfigStatus::Incomplete { missing } => missing,
    };

    output::warning(&format!(
        "stack is not configured (missing: {})",
        missing.iter().join(", ")
    ));
    let run_setup = c
        .prompter
        .confirm("Run setup now?", true)
        .map_err(|e| InfraError::io("read answer", e))?;
    if !run_setup {
        return Err(ApplicationError::NotConfigured { missing }.into());
    }

    let preset = setup_args_from_env()?;
    let options = SetupOptions {
        llm: preset.llm_backend,
        embedding: preset.embedding_backend,
        overrides: provider_overrides(),
        ..SetupOptions::interactive(choose_runtime(c, cli, true)?)
    };
    let outcome = setup.run(&env_path, &options)?;
    output::action("Configured", &outcome.path.display());
    Ok(())
}

#[instrument(skip(c, cli))]
fn cmd_start(c: &ServiceContainer, cli: &Cli, build: bool) -> CliResult<()> {
    ensure_configured(c, cli)?;
    let tool = c.runtime_service().resolve(preferred_runtime(c, cli))?;
    c.stack_service().start(&tool, build)?;
    output::success("Stack started");
    Ok(())
}

#[instrument(skip(c, cli))]
fn cmd_start_infra(c: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    ensure_configured(c, cli)?;
    let tool = c.runtime_service().resolve(preferred_runtime(c, cli))?;
    c.stack_service().start_infra(&tool)?;
    output::success(&format!(
        "Infrastructure started: {}",
        c.settings.infra_services.iter().join(", ")
    ));
    Ok(())
}

#[instrument(skip(c, cli))]
fn cmd_stop(c: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    let tool = c.runtime_service().resolve(preferred_runtime(c, cli))?;
    c.stack_service().stop(&tool)?;
    output::success("Stack stopped");
    Ok(())
}

#[instrument(skip(c, cli))]
fn cmd_clean(c: &ServiceContainer, cli: &Cli, yes: bool) -> CliResult<()> {
    let tool = c.runtime_service().resolve(preferred_runtime(c, cli))?;
    if !yes {
        let confirmed = c
            .prompter
            .confirm(
                "This stops the stack and DELETES all of its volumes (databases, indexes). Continue?",
                false,
            )
            .map_err(|e| InfraError::io("read answer", e))?;
        if !confirmed {
            return Err(ApplicationError::Declined("clean cancelled".into()).into());
        }
    }
    c.stack_service().clean(&tool)?;
    output::success("Stack removed including volumes");
    Ok(())
}

#[instrument(skip(c, cli))]
fn cmd_check(c: &ServiceContainer, cli: &Cli) -> CliResult<()> {
    let svc = c.runtime_service();

    output::header("Runtime");
    let runtime = match svc.detect(preferred_runtime(c, cli)) {
        Ok(rt) => {
            output::success_detail(&format!("{rt} installed"));
            rt
        }
        Err(e) => {
            output::failure(&e);
            return Err(e.into());
        }
    };
    let tool = match svc.compose_tool(runtime) {
        Ok(tool) => {
            output::success_detail(&format!("{} {}", tool.display_name(), tool.version));
            tool
        }
        Err(e) => {
            output::failure(&e);
            return Err(e.into());
        }
    };
    if let Err(e) = svc.check_connectivity(tool.runtime) {
        output::failure(&e);
        return Err(e.into());
    }
    output::success_detail(&format!("{runtime} is reachable"));

    output::header("Configuration");
    let env_path = c.env_path();
    match c.setup_service().status(&env_path) {
        Ok(ConfigStatus::Configured(sel)) => output::success_detail(&format!(
            "{} (llm={}, embedding={})",
            env_path.display(),
            sel.llm,
            sel.embedding
        )),
        Ok(ConfigStatus::Incomplete { missing }) => output::warning(&format!(
            "{} incomplete, run `stackup setup` (missing: {})",
            env_path.display(),
            missing.iter().join(", ")
        )),
        Err(e) => output::warning(&e),
    }
    Ok(())
}

#[instrument(skip(c, cli))]
fn cmd_logs(c: &ServiceContainer, cli: &Cli, options: LogOptions) -> CliResult<()> {
    let tool = c.runtime_service().resolve(preferred_runtime(c, cli))?;
    c.stack_service().logs(&tool, &options)?;
    Ok(())
}

fn cmd_config(c: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&c.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            let mark = |p: &Path| if p.exists() { "" } else { " (not found)" };
            match global_config_path() {
                Some(p) => output::action("global", &format!("{}{}", p.display(), mark(&p))),
                None => output::action("global", "unavailable"),
            }
            let local = local_config_path(&c.project_dir);
            output::action("local", &format!("{}{}", local.display(), mark(&local)));
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".into())
                })?
            } else {
                local_config_path(&c.project_dir)
            };
            if c.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                c.fs
                    .create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            c.fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}
