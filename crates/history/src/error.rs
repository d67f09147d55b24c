use relay_bus::BusError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read dataset {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse dataset: {0}")]
    Parse(String),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
