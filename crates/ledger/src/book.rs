//! Per-symbol position and PnL

use chrono::{DateTime, Utc};
use relay_core::{PositionSide, PositionSnapshot, Side};
use rust_decimal::Decimal;
use rust_decimal::prelude::Signed;
use serde::{Deserialize, Serialize};

/// Position book for one symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolBook {
    /// Current position quantity (positive=long, negative=short)
    pub quantity: Decimal,
    /// Average entry price
    pub avg_price: Decimal,
    /// Total realized PnL
    pub realized_pnl: Decimal,
    /// Total fees paid
    pub total_fees: Decimal,
    /// Number of fills
    pub fill_count: u64,
    /// Total volume traded (absolute)
    pub volume: Decimal,
    /// Last mark (bar close)
    pub mark_price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SymbolBook {
    /// Apply a fill; returns the pnl it realizes
    ///
    /// The closed part realizes against the average entry. A fill that
    /// crosses zero reopens the remainder at the fill price.
    pub fn apply_fill(&mut self, side: Side, quantity: Decimal, price: Decimal, fee: Decimal) -> Decimal {
        let held = self.quantity;
        let delta = side.sign() * quantity;
        let next = held + delta;
        let reducing = self.reduces(delta);

        let realized = if reducing {
            delta.abs().min(held.abs()) * (price - self.avg_price) * held.signum()
        } else {
            Decimal::ZERO
        };

        self.avg_price = if next.is_zero() {
            Decimal::ZERO
        } else if !reducing {
            (held.abs() * self.avg_price + quantity * price) / next.abs()
        } else if next.signum() != held.signum() {
            price
        } else {
            self.avg_price
        };

        self.quantity = next;
        self.realized_pnl += realized;
        self.total_fees += fee;
        self.fill_count += 1;
        self.volume += quantity;
        realized
    }

    /// Whether a signed quantity trades against the open position
    fn reduces(&self, delta: Decimal) -> bool {
        !self.quantity.is_zero() && delta.signum() != self.quantity.signum()
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.quantity * (self.mark_price - self.avg_price)
    }

    /// Realized + unrealized, minus fees
    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl() - self.total_fees
    }

    pub fn snapshot(&self, symbol: &str) -> PositionSnapshot {
        let side = PositionSide::from_net(self.quantity);
        let flat = side == PositionSide::Flat;
        PositionSnapshot {
            symbol: symbol.to_string(),
            side,
            quantity: self.quantity.abs(),
            entry_price: self.avg_price,
            current_price: self.mark_price,
            stop_loss: if flat { None } else { self.stop_loss },
            take_profit: if flat { None } else { self.take_profit },
            pnl: self.total_pnl(),
            timestamp: self.updated_at.unwrap_or_else(Utc::now),
        }
    }
}
