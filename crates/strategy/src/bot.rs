//! Capabilities a strategy may query

use relay_core::PositionSnapshot;
use serde::{Deserialize, Serialize};

use crate::strategy::NativeSignal;

/// Outcome of a pre-trade risk check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCheck {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RiskCheck {
    pub fn passed() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Read-only view of the trading environment
///
/// State only flows towards the strategy; nothing here originates a trade.
pub trait TradingBot: Send + Sync {
    /// Last known position for `symbol`
    fn position(&self, symbol: &str) -> Option<PositionSnapshot>;

    /// All known positions
    fn positions(&self) -> Vec<PositionSnapshot>;

    fn is_healthy(&self) -> bool;

    /// Whether the strategy should keep its logging down
    fn is_quiet(&self) -> bool;

    fn set_quiet(&self, quiet: bool);

    /// Pre-trade check on a native payload
    fn check_risk(&self, signal: &NativeSignal) -> RiskCheck;
}
