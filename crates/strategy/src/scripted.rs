//! Scripted strategy - replays configured native payloads at fixed bar offsets
//!
//! Params: `{"steps": [{"bar": 10, "payload": {"direction": "long", "entry": 61.94}}]}`.
//! `bar` counts replayed bars from 0.

use relay_core::MarketBar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::bot::TradingBot;
use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::strategy::{NativeSignal, Strategy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedStep {
    pub bar: usize,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedConfig {
    pub steps: Vec<ScriptedStep>,
}

pub struct ScriptedStrategy {
    symbol: String,
    steps: HashMap<usize, NativeSignal>,
    bars_seen: usize,
    history_len: usize,
    bot: Arc<dyn TradingBot>,
}

impl ScriptedStrategy {
    pub const REFERENCE: &'static str = "scripted";

    pub fn new(config: StrategyConfig, bot: Arc<dyn TradingBot>) -> Result<Self> {
        let scripted: ScriptedConfig = config.params_as()?;
        let mut steps = HashMap::with_capacity(scripted.steps.len());
        for step in scripted.steps {
            if steps.insert(step.bar, NativeSignal::from(step.payload)).is_some() {
                return Err(StrategyError::InvalidConfig(format!(
                    "duplicate step at bar {}",
                    step.bar
                )));
            }
        }

        Ok(Self {
            symbol: config.symbol,
            steps,
            bars_seen: 0,
            history_len: 0,
            bot,
        })
    }

    /// Registry factory
    pub fn factory(config: StrategyConfig, bot: Arc<dyn TradingBot>) -> Result<Box<dyn Strategy>> {
        Ok(Box::new(Self::new(config, bot)?))
    }

    /// Length of the bootstrap window received
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "ScriptedStrategy"
    }

    fn initialize(&mut self, history: &[MarketBar]) -> Result<()> {
        self.history_len = history.len();
        Ok(())
    }

    fn on_bar(&mut self, bar: &MarketBar) -> Option<NativeSignal> {
        if bar.symbol != self.symbol {
            return None;
        }
        let offset = self.bars_seen;
        self.bars_seen += 1;

        let signal = self.steps.get(&offset)?.clone();
        let check = self.bot.check_risk(&signal);
        if !check.passed {
            log::warn!(
                "[ScriptedStrategy] step at bar {} blocked: {:?}",
                offset,
                check.reason
            );
            return None;
        }
        if !self.bot.is_quiet() {
            log::info!("[ScriptedStrategy] bar {} -> {:?}", offset, signal.fields());
        }
        Some(signal)
    }
}
