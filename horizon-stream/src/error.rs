//! Error types for the horizon-stream crate.

use std::time::Duration;

/// Errors raised by the push channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The broker refused the connection (bad or expired push token)
    #[error("Broker rejected connection: {0}")]
    Rejected(String),

    /// The broker handshake did not complete in time
    #[error("Push channel not connected after {timeout:?}: {last_error}")]
    ConnectTimeout { timeout: Duration, last_error: String },

    /// A frame was published while the channel was down
    #[error("Push channel is not connected")]
    NotConnected,

    /// The outbound queue refused the frame
    #[error("Publish failed: {0}")]
    Publish(String),

    /// The channel was shut down
    #[error("Push channel closed")]
    Closed,

    /// The worker thread could not start its runtime
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl PushError {
    /// A rejected handshake is cured by a fresh session, not by waiting
    pub fn needs_reauthentication(&self) -> bool {
        matches!(self, PushError::Rejected(_))
    }
}

/// Convenience type alias for Results using PushError.
pub type Result<T> = std::result::Result<T, PushError>;
