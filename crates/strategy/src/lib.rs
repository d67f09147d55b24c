//! Relay Strategy Framework
//!
//! Everything a strategy unit sees of the outside world:
//! - `Strategy`: synchronous decision hooks {initialize, on_bar, on_shutdown}
//! - `TradingBot`: read-only capabilities (positions, health, quiet mode)
//! - `StrategyRegistry`: loads a unit by reference with the fixed
//!   (configuration, capability) constructor contract
//! - Built-in units: `ScriptedStrategy`, `MeanReversion`
//!
//! ## Architecture
//!
//! ```text
//!                 StrategyConfig ──┐
//!                                  ▼
//!  StrategyRegistry ── factory(config, Arc<dyn TradingBot>) ──► Box<dyn Strategy>
//!                                                                    │
//!          history ──► initialize()                                  │
//!          MarketBar ──► on_bar() ──► Option<NativeSignal> ──────────┘
//! ```
//!
//! Strategies speak their own payload dialect (`NativeSignal`); the host
//! translates it into the canonical `Signal`.

pub mod bot;
pub mod config;
pub mod error;
pub mod mean_reversion;
pub mod registry;
pub mod scripted;
pub mod strategy;

// Re-export main types
pub use bot::{RiskCheck, TradingBot};
pub use config::StrategyConfig;
pub use error::{Result, StrategyError};
pub use mean_reversion::{MeanReversion, MeanReversionConfig};
pub use registry::{StrategyFactory, StrategyRegistry};
pub use scripted::{ScriptedConfig, ScriptedStep, ScriptedStrategy};
pub use strategy::{NativeSignal, Strategy};

#[cfg(test)]
mod testing;
