//! Relay Runner - Backtest Bridge Controller
//!
//! Replays a historical series into one strategy session and executes what
//! comes back:
//!
//! - **Controller**: per-bar state machine, signal screening and execution
//! - **Config**: one JSON file for every component's settings
//! - **Report**: counters, fills and final positions of a run
//! - **Bridge**: wires bootstrap service, session and controller on one bus
//!
//! ## Architecture
//!
//! ```text
//!   InMemoryDataset ─────────────┬──────────────────────┐
//!        (Arc)                   ▼                      ▼
//!                      HistoricalBootstrapService   BacktestController ── PaperLedger
//!                         ▲  reads ReplayClock ◄──────── advances │
//!                         │                                      │ market-data / position:update
//!   ═══════ global bus ═══╪══════════════════════════════════════╪═══════════
//!                         │ bootstrap   strategy-ready   signal  │
//!                         ▼                                      ▼
//!                 ┌──────────────────── session task ─────────────────────┐
//!                 │  CapabilityProxy ◄─► local bus ◄─► StrategyHost ◄─► unit │
//!                 └────────────────────────────────────────────────────────┘
//! ```

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod report;
pub mod state;

// Re-export main types
pub use bridge::run_backtest;
pub use config::{
    BridgeConfig, BusSettings, ConfigError, ControllerConfig, ControllerSettings, HostSettings,
    LedgerSettings,
};
pub use controller::BacktestController;
pub use error::{ControllerError, Result};
pub use report::BacktestReport;
pub use state::ControllerState;
