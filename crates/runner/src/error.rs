use relay_bus::BusError;
use relay_history::HistoryError;
use relay_host::HostError;
use relay_ports::DataError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::state::ControllerState;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition {
        from: ControllerState,
        to: ControllerState,
    },

    #[error("No readiness from {session_id} within {timeout_ms}ms")]
    ReadinessTimeout { session_id: String, timeout_ms: u64 },

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Bootstrap service error: {0}")]
    History(#[from] HistoryError),

    #[error("Session error: {0}")]
    Host(#[from] HostError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
