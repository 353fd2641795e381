//! Error types for mefm

use crate::comment::model::CommentStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mefm
#[derive(Debug, Error)]
pub enum MefmError {
    /// Input rejected before any network interaction
    #[error("Validation error: {0}")]
    Validation(String),

    /// Status transition precondition violated
    #[error("Cannot {action} a comment in status {from}")]
    InvalidTransition {
        from: CommentStatus,
        action: &'static str,
    },

    /// The persistence service rejected or failed a call
    #[error("Persistence error during {operation}: {message}")]
    Persistence {
        operation: &'static str,
        message: String,
    },

    /// Comment not present in the index
    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    /// The same action is already waiting on the backend
    #[error("Request already in flight: {0}")]
    RequestInFlight(String),

    /// Acting user lacks the required role
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MefmError>,
    },
}

impl MefmError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MefmError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a persistence error for the named backend operation
    pub fn persistence(operation: &'static str, message: impl ToString) -> Self {
        MefmError::Persistence {
            operation,
            message: message.to_string(),
        }
    }

    /// The innermost error, looking through any added context
    pub fn root(&self) -> &MefmError {
        match self {
            MefmError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root(), MefmError::Validation(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self.root(), MefmError::InvalidTransition { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self.root(), MefmError::Persistence { .. })
    }
}

/// Result type alias for mefm
pub type Result<T> = std::result::Result<T, MefmError>;
