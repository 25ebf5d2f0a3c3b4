//! Error types for the VoiceBridge session engine

use thiserror::Error;

/// Result type alias for session engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the session engine
#[derive(Debug, Error)]
pub enum Error {
    /// Microphone or output device acquisition failed. Fatal to a start
    /// attempt; the session falls back to Disconnected.
    #[error("Audio resource error: {0}")]
    AudioResource(String),

    /// Provider channel connect failed
    #[error("Channel connect failed: {0}")]
    ChannelConnect(String),

    /// Sending audio on the provider channel failed
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// A connect is already in flight; re-entrant requests are rejected,
    /// not queued
    #[error("Connect already in progress")]
    ConnectInProgress,

    /// Operation is not valid in the current connection state
    #[error("Invalid state for {op}: {state}")]
    InvalidState {
        /// Operation that was attempted
        op: &'static str,
        /// Connection state at the time of the call
        state: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
