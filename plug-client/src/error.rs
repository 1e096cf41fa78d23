//! Error types for the plug client

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a smart plug
#[derive(Debug, Error)]
pub enum PlugError {
    /// Could not establish a session with the plug
    ///
    /// Covers rejected credentials as well as an unreachable device during login.
    #[error("Login failed: {0}")]
    Authentication(String),

    /// Session established, but the power command did not apply
    #[error("State change failed: {0}")]
    Command(String),

    /// The plug did not answer within the configured timeout
    #[error("Plug did not respond within {0:?}")]
    Timeout(Duration),

    /// The configured plug address could not be parsed
    #[error("Invalid plug address: {0}")]
    InvalidAddress(String),
}

impl PlugError {
    /// Whether this error came from the login phase
    pub fn is_authentication(&self) -> bool {
        matches!(self, PlugError::Authentication(_))
    }

    /// Whether this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlugError::Timeout(_))
    }
}

/// Result type for plug operations
pub type Result<T> = std::result::Result<T, PlugError>;
