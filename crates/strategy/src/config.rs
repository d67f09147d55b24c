use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{Result, StrategyError};

/// Configuration handed to a strategy factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyConfig {
    /// Registry reference, e.g. "mean-reversion"
    pub reference: String,
    pub symbol: String,
    /// Bootstrap window length
    #[serde(alias = "bars_back")]
    pub bars_back: usize,
    /// Strategy-specific parameters
    pub params: Value,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            reference: "mean-reversion".to_string(),
            symbol: "MCL".to_string(),
            bars_back: 50,
            params: Value::Object(Default::default()),
        }
    }
}

impl StrategyConfig {
    pub fn new(reference: impl Into<String>, symbol: impl Into<String>, bars_back: usize) -> Self {
        Self {
            reference: reference.into(),
            symbol: symbol.into(),
            bars_back,
            ..Default::default()
        }
    }

    /// Builder: Set params
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference.trim().is_empty() {
            return Err(StrategyError::InvalidConfig("empty reference".to_string()));
        }
        if self.symbol.trim().is_empty() {
            return Err(StrategyError::InvalidConfig("empty symbol".to_string()));
        }
        Ok(())
    }

    /// Deserialize `params` into a strategy's own config type
    ///
    /// Missing params (`null`) yield the type's default.
    pub fn params_as<T: DeserializeOwned + Default>(&self) -> Result<T> {
        if self.params.is_null() {
            return Ok(T::default());
        }
        T::deserialize(&self.params).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
    }
}
