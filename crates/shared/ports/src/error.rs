use thiserror::Error;

/// Errors raised by a market data source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Invalid range [{start}, {end}) for {symbol}")]
    InvalidRange {
        symbol: String,
        start: usize,
        end: usize,
    },
}

pub type DataResult<T> = std::result::Result<T, DataError>;

/// Errors raised when executing a signal against a ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Nothing to close: {0}")]
    NothingToClose(String),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
