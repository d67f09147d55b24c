//! Relay Ports
//!
//! Port definitions (traits) for the strategy execution bridge.
//! These define the boundaries between the backtest domain and whatever
//! backs it: a dataset, a ledger, a clock.

mod clock;
mod data;
mod error;
mod ledger;

pub use clock::Clock;
pub use data::MarketDataSource;
pub use error::{DataError, DataResult, LedgerError, LedgerResult};
pub use ledger::PortfolioLedger;
