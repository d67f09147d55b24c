use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position side - long (bought), short (sold) or flat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    /// Long position - profit when price rises
    Long,
    /// Short position - profit when price falls
    Short,
    /// No exposure
    Flat,
}

impl PositionSide {
    /// Side implied by a signed net quantity
    pub fn from_net(quantity: Decimal) -> Self {
        if quantity > Decimal::ZERO {
            PositionSide::Long
        } else if quantity < Decimal::ZERO {
            PositionSide::Short
        } else {
            PositionSide::Flat
        }
    }
}

/// Authoritative position state for one symbol
///
/// Only the controller's ledger produces these. Anything a session holds is a
/// mirror of the last snapshot it was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub symbol: String,
    pub side: PositionSide,
    /// Absolute quantity (direction is carried by `side`)
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    /// Realized + unrealized pnl, net of fees
    pub pnl: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PositionSnapshot {
    /// Snapshot of a symbol with no exposure
    pub fn flat(symbol: impl Into<String>, current_price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            side: PositionSide::Flat,
            quantity: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            current_price,
            stop_loss: None,
            take_profit: None,
            pnl: Decimal::ZERO,
            timestamp,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat || self.quantity.is_zero()
    }

    /// Signed quantity (positive = long, negative = short)
    pub fn net_quantity(&self) -> Decimal {
        match self.side {
            PositionSide::Long => self.quantity,
            PositionSide::Short => -self.quantity,
            PositionSide::Flat => Decimal::ZERO,
        }
    }
}
