//! Mean Reversion Strategy
//!
//! Trades deviations of the close from its simple moving average:
//! - Goes long when the close is far below the average (expects a rise)
//! - Goes short when the close is far above the average (expects a fall)
//! - Exits when the close reverts to within the exit band
//!
//! Emits native `{"direction", "qty", "entry"}` payloads; position state comes
//! from the capability proxy, never from its own bookkeeping.

use relay_core::{MarketBar, PositionSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::bot::TradingBot;
use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::strategy::{NativeSignal, Strategy};

/// Configuration for mean reversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeanReversionConfig {
    /// Moving average length in bars
    pub window: usize,
    /// Deviation to enter a position (in basis points)
    pub entry_threshold_bps: Decimal,
    /// Deviation under which an open position is closed (in basis points)
    pub exit_threshold_bps: Decimal,
    /// Size to trade on each entry
    pub trade_size: Decimal,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            window: 20,
            entry_threshold_bps: dec!(50), // 0.5% deviation to enter
            exit_threshold_bps: dec!(10),  // 0.1% to exit
            trade_size: dec!(1),
        }
    }
}

pub struct MeanReversion {
    symbol: String,
    config: MeanReversionConfig,
    closes: VecDeque<Decimal>,
    bot: Arc<dyn TradingBot>,
}

impl MeanReversion {
    pub const REFERENCE: &'static str = "mean-reversion";

    pub fn new(config: StrategyConfig, bot: Arc<dyn TradingBot>) -> Result<Self> {
        let params: MeanReversionConfig = config.params_as()?;
        if params.window < 2 {
            return Err(StrategyError::InvalidConfig(
                "window must be at least 2 bars".to_string(),
            ));
        }
        if params.trade_size <= Decimal::ZERO {
            return Err(StrategyError::InvalidConfig(
                "tradeSize must be positive".to_string(),
            ));
        }
        if params.exit_threshold_bps > params.entry_threshold_bps {
            return Err(StrategyError::InvalidConfig(
                "exit threshold above entry threshold".to_string(),
            ));
        }

        Ok(Self {
            symbol: config.symbol,
            closes: VecDeque::with_capacity(params.window + 1),
            config: params,
            bot,
        })
    }

    /// Registry factory
    pub fn factory(config: StrategyConfig, bot: Arc<dyn TradingBot>) -> Result<Box<dyn Strategy>> {
        Ok(Box::new(Self::new(config, bot)?))
    }

    fn push_close(&mut self, close: Decimal) {
        self.closes.push_back(close);
        while self.closes.len() > self.config.window {
            self.closes.pop_front();
        }
    }

    /// Simple moving average once the window is full
    fn moving_average(&self) -> Option<Decimal> {
        if self.closes.len() < self.config.window {
            return None;
        }
        let sum: Decimal = self.closes.iter().sum();
        Some(sum / Decimal::from(self.closes.len()))
    }

    /// Deviation = (close - ma) / ma * 10000
    fn deviation_bps(&self, close: Decimal) -> Option<Decimal> {
        let ma = self.moving_average()?;
        if ma.is_zero() {
            return None;
        }
        Some((close - ma) / ma * dec!(10000))
    }

    fn entry(&self, direction: &str, close: Decimal) -> NativeSignal {
        NativeSignal::new()
            .with("direction", direction)
            .with("qty", self.config.trade_size.to_string())
            .with("entry", close.to_string())
    }

    fn generate_signal(&self, close: Decimal) -> Option<NativeSignal> {
        let deviation_bps = self.deviation_bps(close)?;
        let side = self
            .bot
            .position(&self.symbol)
            .map(|p| p.side)
            .unwrap_or(PositionSide::Flat);

        let signal = match side {
            PositionSide::Flat if deviation_bps > self.config.entry_threshold_bps => {
                // Above the average -> SHORT (expect reversion down)
                self.entry("short", close)
            }
            PositionSide::Flat if deviation_bps < -self.config.entry_threshold_bps => {
                // Below the average -> LONG (expect reversion up)
                self.entry("long", close)
            }
            PositionSide::Long if deviation_bps.abs() < self.config.exit_threshold_bps => {
                NativeSignal::new().with("direction", "exit_long")
            }
            PositionSide::Short if deviation_bps.abs() < self.config.exit_threshold_bps => {
                NativeSignal::new().with("direction", "exit_short")
            }
            _ => return None,
        };

        if !self.bot.is_quiet() {
            log::info!(
                "[MeanReversion] {:?}: close={}, deviation={:.2}bps, position={:?}",
                signal.get("direction"),
                close,
                deviation_bps,
                side
            );
        }
        Some(signal)
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        "MeanReversion"
    }

    fn initialize(&mut self, history: &[MarketBar]) -> Result<()> {
        let closes: Vec<_> = history
            .iter()
            .filter(|b| b.symbol == self.symbol)
            .map(|b| b.close)
            .collect();
        for close in closes {
            self.push_close(close);
        }
        log::debug!(
            "[MeanReversion] seeded {} closes for {} (window {})",
            self.closes.len(),
            self.symbol,
            self.config.window
        );
        Ok(())
    }

    fn on_bar(&mut self, bar: &MarketBar) -> Option<NativeSignal> {
        if bar.symbol != self.symbol {
            return None;
        }
        self.push_close(bar.close);
        self.generate_signal(bar.close)
    }
}
