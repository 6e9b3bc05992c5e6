//! Error types for the companion core
//!
//! Every failure here is recoverable: the worst a caller sees is a toast and
//! a pairing screen parked in the error state until retry.

use thiserror::Error;

/// Result type alias for companion operations
pub type Result<T> = std::result::Result<T, CompanionError>;

/// Main error type for the companion core
#[derive(Debug, Error)]
pub enum CompanionError {
    /// User input rejected before it reached the replica
    #[error("Validation error: {0}")]
    Validation(String),

    /// Inbound document (sync payload, import file) is not the expected shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Pairing transport failure (bind, handshake, socket)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Host clipboard rejected a write
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Command not found in registry
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Invalid command arguments
    #[error("Invalid arguments for command '{command}': {reason}")]
    InvalidArgs { command: String, reason: String },

    /// Entity lookup by id came up empty
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error (catch-all)
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for CompanionError {
    fn from(err: anyhow::Error) -> Self {
        CompanionError::Other(err.to_string())
    }
}

impl From<String> for CompanionError {
    fn from(err: String) -> Self {
        CompanionError::Other(err)
    }
}

impl From<&str> for CompanionError {
    fn from(err: &str) -> Self {
        CompanionError::Other(err.to_string())
    }
}

impl CompanionError {
    /// Get user-friendly error message for display by the shell
    pub fn user_message(&self) -> String {
        match self {
            CompanionError::CommandNotFound(cmd) => {
                format!("Command '{}' is not available.", cmd)
            },
            CompanionError::InvalidArgs { command, reason } => {
                format!("Invalid arguments for '{}': {}", command, reason)
            },
            CompanionError::Validation(msg) => msg.clone(),
            CompanionError::Transport(msg) => {
                format!("Connection problem: {}", msg)
            },
            CompanionError::Database(err) => {
                format!("Database error: {}", err)
            },
            _ => self.to_string(),
        }
    }

    /// Translation key for the toast a shell should raise, when one applies.
    ///
    /// Keys resolve against the bundled catalog; infrastructure errors get no
    /// toast key and surface through `user_message` instead.
    pub fn toast_key(&self) -> Option<&'static str> {
        match self {
            CompanionError::Validation(_) => Some("fill_required"),
            CompanionError::InvalidFormat(_) => Some("invalid_file"),
            CompanionError::Transport(_) => Some("connection_error"),
            CompanionError::Clipboard(_) => Some("copy_failed"),
            _ => None,
        }
    }

    /// Get error category for logging/telemetry
    pub fn category(&self) -> &'static str {
        match self {
            CompanionError::Validation(_) => "validation",
            CompanionError::InvalidFormat(_) => "format",
            CompanionError::Transport(_) => "transport",
            CompanionError::Clipboard(_) => "clipboard",
            CompanionError::CommandNotFound(_) => "command",
            CompanionError::InvalidArgs { .. } => "arguments",
            CompanionError::NotFound(_) => "not_found",
            CompanionError::Serde(_) => "serialization",
            CompanionError::Database(_) => "database",
            CompanionError::Io(_) => "io",
            CompanionError::Config(_) => "config",
            CompanionError::Other(_) => "other",
        }
    }
}
