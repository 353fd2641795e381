//! Configuration management for mefm

use crate::comment::policy::BLOCKED_PLACEHOLDER;
use crate::comment::validator::MAX_COMMENT_LENGTH;
use crate::error::{MefmError, Result};
use crate::types::User;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "mefm.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Persistence backend settings
    pub backend: BackendConfig,
    /// Comment settings
    pub comments: CommentsConfig,
    /// Moderation settings
    pub moderation: ModerationConfig,
    /// Signed-in user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<User>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MefmError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| MefmError::Toml(e.to_string()))?;
        config.validate()?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(MefmError::FileNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MefmError::Toml(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Default location in the platform config directory
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("ca", "mefm", "mefm")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(".mefm").join(CONFIG_FILE_NAME))
    }

    /// Reject values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(MefmError::Config("backend.base_url cannot be empty".to_string()));
        }
        if self.backend.timeout_secs == 0 {
            return Err(MefmError::Config("backend.timeout_secs must be positive".to_string()));
        }
        if self.comments.max_length == 0 {
            return Err(MefmError::Config("comments.max_length must be positive".to_string()));
        }
        Ok(())
    }
}

/// Persistence backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the REST service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            token: None,
        }
    }
}

/// Comment-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// Maximum comment text length in characters
    pub max_length: usize,
    /// Text shown instead of a blocked comment
    pub blocked_placeholder: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_COMMENT_LENGTH,
            blocked_placeholder: BLOCKED_PLACEHOLDER.to_string(),
        }
    }
}

/// Moderation-related configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Also let users flag comments still awaiting approval
    pub flag_pending: bool,
}
