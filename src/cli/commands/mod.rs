//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod history;
mod init;
mod install;
mod plugins;
mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "docsnaps")]
#[command(about = "Watch published documents and keep a snapshot of every change")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing docsnaps.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Install the watch jobs supplied by a plugin module
    Install {
        /// Module identifier of the plugin
        module: String,
        /// Create the jobs disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Fetch every enabled job once and store changed documents
    Run,

    /// List available plugin modules
    Plugins,

    /// Show the stored snapshots of one job
    History {
        /// Document instance id
        instance_id: i32,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        target: cli.target,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    if let Some(ref path) = config.source_path {
        tracing::debug!("Using config file {}", path.display());
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Install { module, disabled } => {
            install::cmd_install(&settings, &module, disabled).await
        }
        Commands::Run => run::cmd_run(&settings).await,
        Commands::Plugins => plugins::cmd_plugins(&settings).await,
        Commands::History { instance_id } => history::cmd_history(&settings, instance_id).await,
    }
}
