//! Error types for the bus crate

use thiserror::Error;

/// A message that cannot be acted on; logged and dropped, never fatal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Malformed message on {channel}: {reason}")]
    Malformed { channel: String, reason: String },

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Correlation mismatch: expected {expected}, got {actual}")]
    CorrelationMismatch { expected: String, actual: String },
}

/// Bus-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },

    #[error("Namespace violation: {channel} is outside this client's policy")]
    NamespaceViolation { channel: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timeout waiting for message")]
    Timeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl BusError {
    /// Whether the error means the broker is unreachable
    pub fn is_connection(&self) -> bool {
        matches!(self, BusError::NotConnected | BusError::ConnectionLost { .. })
    }
}

pub type Result<T> = std::result::Result<T, BusError>;
