use thiserror::Error;

/// Errors raised while loading or initializing a strategy unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Unknown strategy reference: {0}")]
    UnknownStrategy(String),

    #[error("Invalid strategy configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy initialization failed: {0}")]
    Initialization(String),
}

pub type Result<T> = std::result::Result<T, StrategyError>;
