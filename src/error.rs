//! Error types for the feedback portal
//!
//! This module provides error handling using thiserror for structured error
//! definitions and anyhow for error propagation at the edges. The HTTP mapping
//! of each variant lives in `api::error`.

use thiserror::Error;

/// Main error type for feedback portal operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Required request field missing or malformed
    #[error("{0}")]
    InvalidInput(String),

    /// Identifier unknown or password mismatch; the message never says which
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Bearer token missing, malformed, or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Feedback already carries a reply
    #[error("Feedback already replied: {0}")]
    AlreadyReplied(String),

    /// Password hashing failed
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Session token could not be signed
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for feedback portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

impl From<libsql::Error> for PortalError {
    fn from(err: libsql::Error) -> Self {
        PortalError::Database(err.to_string())
    }
}

/// Convert anyhow::Error to PortalError
impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        PortalError::Other(err.to_string())
    }
}

impl PortalError {
    /// True for errors caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PortalError::InvalidInput(_)
                | PortalError::InvalidCredentials
                | PortalError::Unauthorized(_)
                | PortalError::NotFound(_)
                | PortalError::AlreadyReplied(_)
        )
    }
}
