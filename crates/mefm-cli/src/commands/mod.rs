//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod comments;
pub mod config;
pub mod moderate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mefm_client::HttpCommentStore;
use mefm_core::comment::CommentManager;
use mefm_core::config::Config;
use mefm_core::identity::StaticIdentity;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// mefm - comments and moderation for the practitioner directory
#[derive(Debug, Parser)]
#[command(name = "mefm")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "MEFM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read, write and flag comments on a practitioner
    #[command(subcommand)]
    Comments(comments::CommentsCommand),

    /// Review pending and flagged comments
    #[command(subcommand)]
    Moderate(moderate::ModerateCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

/// Run the CLI application
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Comments(cmd) => comments::execute(cmd, &config_path).await,
        Commands::Moderate(cmd) => moderate::execute(cmd, &config_path).await,
        Commands::Config(cmd) => config::execute(cmd, &config_path),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::try_from_env("MEFM_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Build a comment manager wired to the configured backend and user
pub(crate) fn open_manager(config_path: &Path) -> Result<CommentManager> {
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let store = HttpCommentStore::from_config(&config.backend)?;
    tracing::debug!(backend = %store.base_url(), signed_in = config.identity.is_some(), "opening comment store");
    let identity = StaticIdentity::from(config.identity.clone());
    Ok(CommentManager::from_config(
        Arc::new(store),
        Arc::new(identity),
        &config,
    ))
}

/// Await `task` behind a spinner on stderr
pub(crate) async fn with_spinner<F, T>(message: &str, task: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = task.await;
    spinner.finish_and_clear();
    output
}
