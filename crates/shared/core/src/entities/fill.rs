use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Side, SignalAction};

/// A fill confirmed by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub symbol: String,
    /// Signal action that caused this fill
    pub action: SignalAction,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    /// PnL realized by this fill (zero when opening)
    pub realized_pnl: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Notional value of the fill
    pub fn notional(&self) -> Decimal {
        self.price * self.quantity
    }
}
