//! Error types for horizon-state

use crate::model::DeviceId;
use horizon_api::FetchError;
use horizon_stream::PushError;
use std::fmt;

/// Result type for horizon-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur while tracking or driving a box
#[derive(Debug, Clone, PartialEq)]
pub enum StateError {
    /// No catalog channel carries the requested display name
    ChannelNotFound(String),

    /// Box not known to the registry
    DeviceNotFound(DeviceId),

    /// A frame did not have the expected shape
    Protocol(String),

    /// Metadata enrichment failed
    Fetch(FetchError),

    /// A command frame could not be published
    Push(PushError),

    /// Frame handling panicked
    Panic(String),

    /// A worker thread could not be started
    Spawn(String),

    /// The registry no longer accepts work
    ShutDown,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::ChannelNotFound(name) => write!(f, "Channel not found: {}", name),
            StateError::DeviceNotFound(id) => write!(f, "Set-top box not found: {}", id),
            StateError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            StateError::Fetch(err) => write!(f, "Metadata fetch failed: {}", err),
            StateError::Push(err) => write!(f, "Push error: {}", err),
            StateError::Panic(msg) => write!(f, "Frame handler panicked: {}", msg),
            StateError::Spawn(msg) => write!(f, "Failed to start worker thread: {}", msg),
            StateError::ShutDown => write!(f, "Registry is shut down"),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StateError::Fetch(err) => Some(err),
            StateError::Push(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for StateError {
    fn from(err: FetchError) -> Self {
        StateError::Fetch(err)
    }
}

impl From<PushError> for StateError {
    fn from(err: PushError) -> Self {
        StateError::Push(err)
    }
}
