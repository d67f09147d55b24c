use relay_bus::{BusError, ProtocolError};
use relay_strategy::StrategyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Bootstrap {request_id} timed out after {timeout_ms}ms")]
    BootstrapTimeout { request_id: String, timeout_ms: u64 },

    #[error("Bootstrap {request_id} rejected: {reason}")]
    BootstrapRejected { request_id: String, reason: String },

    #[error("Session task failed: {0}")]
    Join(String),
}

impl From<ProtocolError> for HostError {
    fn from(e: ProtocolError) -> Self {
        HostError::Bus(BusError::Protocol(e))
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
