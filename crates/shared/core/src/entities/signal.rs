//! Signal - a strategy's trade decision in canonical form
//!
//! Strategies emit payloads in whatever shape they like; the host translates
//! them into this schema before anything leaves the session. The native payload
//! rides along in `raw` for observability only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::values::SessionId;

/// What the strategy wants done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Buy,
    Sell,
    CloseLong,
    CloseShort,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::CloseLong => "CLOSE_LONG",
            Self::CloseShort => "CLOSE_SHORT",
        }
    }

    /// Whether this action only reduces an existing position
    pub fn is_close(&self) -> bool {
        matches!(self, Self::CloseLong | Self::CloseShort)
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical trading signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub action: SignalAction,
    pub price: Decimal,
    pub size: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    pub session_id: SessionId,
    /// Timestamp of the bar that produced the decision
    pub timestamp: DateTime<Utc>,
    /// Strategy's native payload, untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl Signal {
    /// Create a new signal
    pub fn new(
        action: SignalAction,
        price: Decimal,
        size: Decimal,
        session_id: SessionId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            price,
            size,
            stop_loss: None,
            take_profit: None,
            session_id,
            timestamp,
            raw: None,
        }
    }

    /// Builder: Set stop loss
    pub fn with_stop_loss(mut self, price: Decimal) -> Self {
        self.stop_loss = Some(price);
        self
    }

    /// Builder: Set take profit
    pub fn with_take_profit(mut self, price: Decimal) -> Self {
        self.take_profit = Some(price);
        self
    }

    /// Builder: Attach the native payload
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Deduplication key: `timestamp + action + price`
    ///
    /// Prices are normalized so `61.940` and `61.94` collide.
    pub fn idempotency_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.timestamp.timestamp_millis(),
            self.action.as_str(),
            self.price.normalize()
        )
    }
}
