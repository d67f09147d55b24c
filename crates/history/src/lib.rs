//! Relay History
//!
//! Serves the bootstrap window a strategy asks for at startup:
//!
//! ```text
//! backtest:historical-data:request ──► HistoricalBootstrapService
//!                                          │  idx = ReplayClock::index()
//!                                          │  [max(0, idx - barsBack), idx)
//!                                          ▼
//!                                     InMemoryDataset (Arc, read-only)
//!                                          │
//! backtest:historical-data:response ◄──────┘  correlated by requestId
//! ```
//!
//! Unknown symbols get an explicit failed response, never a synthetic series.

pub mod dataset;
pub mod error;
pub mod service;
pub mod stats;

pub use dataset::InMemoryDataset;
pub use error::{HistoryError, Result};
pub use service::HistoricalBootstrapService;
pub use stats::{ServiceStats, StatsSnapshot};
