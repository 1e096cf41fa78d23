//! Error types for audio device access

use thiserror::Error;

/// Errors raised by an audio backend
#[derive(Debug, Error)]
pub enum AudioError {
    /// Connecting to or querying the audio server failed
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// The device disappeared between observation and use
    #[error("Device not available: {0}")]
    DeviceUnavailable(String),

    /// A channel index outside the device's channel map
    #[error("Channel {index} out of range (device has {count} channels)")]
    ChannelOutOfRange { index: usize, count: usize },

    /// The observer has already been closed
    #[error("Observer is closed")]
    Closed,

    /// The observer already has a subscriber
    #[error("Observer already has a subscriber")]
    AlreadySubscribed,
}

/// Result type for audio device operations
pub type Result<T> = std::result::Result<T, AudioError>;
