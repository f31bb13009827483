mod agent;
mod ai;
mod cmd_config;
mod config;
mod crew;
mod error;
mod frontend;
mod health;
mod protocol;
mod sink;
mod task;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::crew::Crew;
use crate::sink::EventSink;

#[derive(Parser)]
#[command(
    name = "blogcrew",
    about = "Researcher + writer agents that turn a topic into a short blog post",
    version
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// One-shot topic (otherwise read topics interactively)
    #[arg(short, long)]
    topic: Option<String>,

    /// Log progress at info level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Create default settings.json
    Init,
    /// Show current configuration (secrets masked)
    Show,
    /// Set a config value (dot notation: backend.model)
    Set {
        /// Config key path
        key: String,
        /// Value to set
        value: String,
    },
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Config { action }) = &cli.command {
        let path = cli.config.unwrap_or_else(config::default_config_path);
        return cmd_config::run(action, &path);
    }

    // Logs go to stderr so the transcript on stdout stays readable.
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = config::AppConfig::load_or_default(&config_path)?.with_env_overrides();
    info!("Config loaded");

    let sink = EventSink::new();
    let crew = Arc::new(Crew::bootstrap(&config, sink).await?);

    let fe = frontend::cli::CliFrontend {
        topic: cli.topic,
        show_inputs: config.shell.show_inputs,
    };
    fe.run(crew).await
}
