//! Configuration loading for the backtest bridge
//!
//! One JSON file covers every component:
//! - Controller timings and the replay window
//! - Bus reconnect backoff and inbox sizing
//! - Host bootstrap timeout and default signal size
//! - Strategy reference, symbol and params
//! - Ledger fees and the dataset location
//!
//! Every field is optional.

use relay_bus::BackoffPolicy;
use relay_host::HostConfig;
use relay_strategy::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub controller: ControllerSettings,

    #[serde(default)]
    pub bus: BusSettings,

    #[serde(default)]
    pub host: HostSettings,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub ledger: LedgerSettings,

    /// JSON bar file, `{symbol: [bars]}`
    #[serde(default)]
    pub dataset_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,
    #[serde(default = "default_bar_budget_ms")]
    pub bar_budget_ms: u64,
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    /// First streamed bar; defaults to `bars_back` so the bootstrap window is full
    #[serde(default)]
    pub start_index: Option<usize>,
    /// One past the last streamed bar; defaults to the end of the series
    #[serde(default)]
    pub end_index: Option<usize>,
}

fn default_readiness_timeout_ms() -> u64 {
    10_000
}

fn default_bar_budget_ms() -> u64 {
    1_000
}

fn default_drain_timeout_ms() -> u64 {
    2_000
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            bar_budget_ms: default_bar_budget_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            start_index: None,
            end_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSettings {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

fn default_initial_backoff_ms() -> u64 {
    50
}

fn default_max_backoff_ms() -> u64 {
    1_000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_inbox_capacity() -> usize {
    1024
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            inbox_capacity: default_inbox_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSettings {
    #[serde(default = "default_bootstrap_timeout_ms")]
    pub bootstrap_timeout_ms: u64,
    #[serde(default = "default_size")]
    pub default_size: Decimal,
}

fn default_bootstrap_timeout_ms() -> u64 {
    5_000
}

fn default_size() -> Decimal {
    Decimal::ONE
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: default_bootstrap_timeout_ms(),
            default_size: default_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Fraction of notional charged per fill
    #[serde(default)]
    pub fee_rate: Decimal,
}

/// Controller timings resolved from a `BridgeConfig`
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub symbol: String,
    pub readiness_timeout: Duration,
    pub bar_budget: Duration,
    pub drain_timeout: Duration,
    pub start_index: usize,
    pub end_index: Option<usize>,
    pub inbox_capacity: usize,
    pub backoff: BackoffPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        BridgeConfig::default().controller_config()
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let start = self.start_index();
        if let Some(end) = self.controller.end_index
            && end <= start
        {
            return Err(ConfigError::Invalid(format!(
                "end_index {} must be after start_index {}",
                end, start
            )));
        }
        if self.bus.max_reconnect_attempts == 0 {
            return Err(ConfigError::Invalid("max_reconnect_attempts must be at least 1".into()));
        }
        if self.host.default_size <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "default_size must be positive, got {}",
                self.host.default_size
            )));
        }
        Ok(())
    }

    pub fn start_index(&self) -> usize {
        self.controller.start_index.unwrap_or(self.strategy.bars_back)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.bus.initial_backoff_ms),
            Duration::from_millis(self.bus.max_backoff_ms),
            self.bus.max_reconnect_attempts,
        )
    }

    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            bootstrap_timeout_ms: self.host.bootstrap_timeout_ms,
            default_size: self.host.default_size,
            inbox_capacity: self.bus.inbox_capacity,
            backoff: self.backoff(),
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            symbol: self.strategy.symbol.clone(),
            readiness_timeout: Duration::from_millis(self.controller.readiness_timeout_ms),
            bar_budget: Duration::from_millis(self.controller.bar_budget_ms),
            drain_timeout: Duration::from_millis(self.controller.drain_timeout_ms),
            start_index: self.start_index(),
            end_index: self.controller.end_index,
            inbox_capacity: self.bus.inbox_capacity,
            backoff: self.backoff(),
        }
    }
}
