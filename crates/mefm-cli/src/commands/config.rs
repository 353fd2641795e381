//! Config command
//!
//! Manage mefm configuration.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use mefm_core::config::Config;
use mefm_core::types::{Role, User};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Backend base URL
        #[arg(long)]
        backend: Option<String>,

        /// User ID to act as
        #[arg(long, requires = "username")]
        user_id: Option<String>,

        /// Username to act as
        #[arg(long, requires = "user_id")]
        username: Option<String>,

        /// Act as a moderator
        #[arg(long)]
        moderator: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, config_path: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show_config(config_path, json),
        ConfigCommand::Init {
            backend,
            user_id,
            username,
            moderator,
            force,
        } => {
            let identity = match (user_id, username) {
                (Some(id), Some(name)) => {
                    let role = if moderator { Role::Moderator } else { Role::User };
                    Some(User::new(id, name).with_role(role))
                }
                _ => None,
            };
            init_config(config_path, backend, identity, force)
        }
    }
}

fn show_config(config_path: &Path, as_json: bool) -> Result<()> {
    if !config_path.exists() {
        eprintln!(
            "{} Configuration not found at {}; showing defaults. Run '{}' to create it.",
            "⚠".yellow(),
            config_path.display(),
            "mefm config init".cyan()
        );
    }

    let config = Config::load_or_default(config_path)
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{}", "Configuration:".bold().underline());
        println!("{}", config_path.display().to_string().dimmed());
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}

fn init_config(
    config_path: &Path,
    backend: Option<String>,
    identity: Option<User>,
    force: bool,
) -> Result<()> {
    if config_path.exists() && !force {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(format!("Overwrite {}?", config_path.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    let config = build_config(backend, identity);
    config.validate()?;
    config
        .save(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!(
        "{} Configuration written to {}",
        "✓".green(),
        config_path.display()
    );
    if config.identity.is_none() {
        println!(
            "  Add an {} section to post or moderate comments.",
            "[identity]".cyan()
        );
    }

    Ok(())
}

fn build_config(backend: Option<String>, identity: Option<User>) -> Config {
    let mut config = Config::default();
    if let Some(url) = backend {
        config.backend.base_url = url;
    }
    config.identity = identity;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mefm.toml");

        init_config(
            &path,
            Some("https://mefm.example.org/api".to_string()),
            Some(User::new("9", "moira").with_role(Role::Moderator)),
            true,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend.base_url, "https://mefm.example.org/api");
        assert!(config.identity.unwrap().role.can_moderate());
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(None, None);
        assert_eq!(config.backend.base_url, Config::default().backend.base_url);
        assert!(config.identity.is_none());
    }
}
