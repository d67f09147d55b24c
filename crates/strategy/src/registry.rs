//! Strategy loader keyed by reference

use std::collections::HashMap;
use std::sync::Arc;

use crate::bot::TradingBot;
use crate::config::StrategyConfig;
use crate::error::{Result, StrategyError};
use crate::mean_reversion::MeanReversion;
use crate::scripted::ScriptedStrategy;
use crate::strategy::Strategy;

/// Constructor contract every strategy unit follows: (configuration, capabilities)
pub type StrategyFactory = fn(StrategyConfig, Arc<dyn TradingBot>) -> Result<Box<dyn Strategy>>;

/// Maps references to factories
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategies
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ScriptedStrategy::REFERENCE, ScriptedStrategy::factory);
        registry.register(MeanReversion::REFERENCE, MeanReversion::factory);
        registry
    }

    pub fn register(&mut self, reference: impl Into<String>, factory: StrategyFactory) {
        self.factories.insert(reference.into(), factory);
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.factories.contains_key(reference)
    }

    /// Registered references, sorted
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        refs.sort_unstable();
        refs
    }

    /// Construct exactly one strategy unit
    ///
    /// Unknown references and invalid configuration fail here, before any
    /// bus traffic.
    pub fn load(
        &self,
        config: StrategyConfig,
        bot: Arc<dyn TradingBot>,
    ) -> Result<Box<dyn Strategy>> {
        config.validate()?;
        let factory = self
            .factories
            .get(&config.reference)
            .ok_or_else(|| StrategyError::UnknownStrategy(config.reference.clone()))?;

        let reference = config.reference.clone();
        let strategy = factory(config, bot)?;
        log::info!("[StrategyRegistry] loaded {} as {}", reference, strategy.name());
        Ok(strategy)
    }
}
