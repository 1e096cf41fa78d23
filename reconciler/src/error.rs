//! Error types for the reconciler

use audio_device::AudioError;
use thiserror::Error;

/// Result type for reconciler operations
pub type Result<T> = std::result::Result<T, ReconcilerError>;

/// Errors that prevent the reconciler from starting
///
/// Once started, plug failures are logged and retried, never returned.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// The cooldown timer thread could not be spawned
    #[error("Failed to start cooldown timer: {0}")]
    Timer(#[from] std::io::Error),

    /// Subscribing to the output device observer failed
    #[error("Failed to observe output devices: {0}")]
    Observer(#[from] AudioError),
}
