//! Relay Host
//!
//! Runs exactly one strategy unit inside an isolated session:
//!
//! ```text
//!  session task                                        shared
//! ┌────────────────────────────────────────┐
//! │ Strategy ◄── StrategyHost ◄── Inbox    │
//! │    │              │             ▲      │
//! │    │ TradingBot   │ signal      │ bars │
//! │    ▼              ▼             │      │
//! │ CapabilityProxy ◄──► local broker      │        global broker
//! │   mirror / quiet / pending ids ◄──────────────► backtest:*
//! └────────────────────────────────────────┘
//!   ReadinessAnnouncer ─────────────────────────────► backtest:strategy-ready
//! ```
//!
//! Startup order: subscriptions, one bootstrap request, `initialize`, readiness.
//! Bars arriving before readiness are dropped.

pub mod config;
pub mod error;
pub mod host;
pub mod proxy;
pub mod readiness;
pub mod session;
pub mod translate;

pub use config::HostConfig;
pub use error::{HostError, Result};
pub use host::{SessionSummary, StrategyHost};
pub use proxy::CapabilityProxy;
pub use readiness::ReadinessAnnouncer;
pub use session::{SessionHandle, spawn_session};
pub use translate::SignalTranslator;
