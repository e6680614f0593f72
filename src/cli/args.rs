//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{EmbeddingBackend, LlmBackend, RuntimeKind};

/// Set up and launch the LLM application stack with docker or podman
#[derive(Parser, Debug)]
#[command(name = "stackup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project directory holding the compose files (default: cwd)
    #[arg(short = 'C', long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Container runtime to use (default: autodetect)
    #[arg(long, global = true, env = "RUNTIME")]
    pub runtime: Option<RuntimeKind>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect provider credentials into the env file (default)
    Setup(SetupArgs),

    /// Start the whole stack
    Start {
        /// Rebuild images before starting
        #[arg(long)]
        build: bool,
    },

    /// Start only the infrastructure services
    #[command(name = "start:infra")]
    StartInfra,

    /// Stop the stack
    Stop,

    /// Stop the stack and delete its volumes
    Clean {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Check runtime, compose version, connectivity and configuration
    Check,

    /// Show stack logs
    Logs {
        /// Follow log output
        #[arg(short, long)]
        follow: bool,
        /// Number of lines to show per service (default from config)
        #[arg(long)]
        tail: Option<u32>,
        /// Services to show (default: all)
        services: Vec<String>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug, Default, Clone)]
pub struct SetupArgs {
    /// LLM backend (openai, azure, ollama, openai-compatible)
    #[arg(long, env = "LLM_BACKEND")]
    pub llm_backend: Option<LlmBackend>,

    /// Embedding backend (openai, azure, ollama)
    #[arg(long, env = "EMBEDDING_BACKEND")]
    pub embedding_backend: Option<EmbeddingBackend>,

    /// Never prompt; take values from the environment, the env file and defaults
    #[arg(long)]
    pub non_interactive: bool,

    /// Reconfigure even if the env file is already complete
    #[arg(long)]
    pub reconfigure: bool,

    /// Do not offer to start the stack afterwards
    #[arg(long)]
    pub no_start: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
