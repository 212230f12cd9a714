//! Ticketsmith CLI: the main entry point.
//!
//! Commands:
//! - `run`          Run one mission through the scaffolder or the reviewer
//! - `config`       Show, validate or locate the configuration
//! - `fingerprint`  Print the scaffold fingerprint of a mission

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use ticketsmith_core::ExecutionMode;

mod commands;

use commands::run::{Flow, RunArgs};

#[derive(Parser)]
#[command(
    name = "ticketsmith",
    about = "Ticketsmith: turns tracker tickets into changesets",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.ticketsmith/config.toml)
    #[arg(short, long, global = true, env = "TICKETSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mission against the journaling adapters
    Run {
        /// Which agent handles the mission
        #[arg(long, value_enum)]
        flow: Flow,

        /// Mission JSON file
        #[arg(long)]
        mission: PathBuf,

        /// Override the configured execution mode (deterministic | react)
        #[arg(long)]
        mode: Option<ExecutionMode>,

        /// Directory of Markdown documentation pages
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Replay model replies from a JSON file instead of calling providers
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Initial repository state (branches, merge requests, diff) as JSON
        #[arg(long)]
        repo_state: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Print the scaffold fingerprint of a mission
    Fingerprint {
        /// Mission JSON file
        #[arg(long)]
        mission: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the configuration
    Validate,
    /// Print the default configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            flow,
            mission,
            mode,
            docs,
            replay,
            repo_state,
        } => {
            let args = RunArgs {
                flow,
                mission,
                mode,
                docs,
                replay,
                repo_state,
            };
            commands::run::run(config_path, args).await?
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
        },
        Commands::Fingerprint { mission } => commands::fingerprint::run(config_path, &mission)?,
    }

    Ok(())
}
