use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar of historical market data
///
/// Bars are produced by the data source and never mutated afterwards;
/// strategies only ever see them by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketBar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl MarketBar {
    /// Create a new bar
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check OHLC consistency (low <= open/close <= high, non-negative volume)
    pub fn is_consistent(&self) -> bool {
        self.low <= self.high
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
            && self.volume >= Decimal::ZERO
    }

    /// Midpoint of the bar's range
    pub fn mid(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> MarketBar {
        MarketBar::new("MCL", Utc::now(), open, high, low, close, dec!(100))
    }

    #[test]
    fn test_consistency() {
        assert!(bar(dec!(61), dec!(62), dec!(60), dec!(61.5)).is_consistent());
        assert!(!bar(dec!(63), dec!(62), dec!(60), dec!(61.5)).is_consistent());
        assert!(!bar(dec!(61), dec!(60), dec!(62), dec!(61)).is_consistent());
    }

    #[test]
    fn test_mid() {
        assert_eq!(bar(dec!(61), dec!(62), dec!(60), dec!(61)).mid(), dec!(61));
    }
}
