//! Paper ledger - fills every accepted signal at its price

use relay_core::{Fill, MarketBar, PositionSnapshot, Side, Signal, SignalAction};
use relay_ports::{LedgerError, LedgerResult, PortfolioLedger};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::book::SymbolBook;

/// In-memory ledger owned by the backtest controller
#[derive(Debug, Default)]
pub struct PaperLedger {
    /// Fee as a fraction of notional (0.0002 = 2bps)
    fee_rate: Decimal,
    books: BTreeMap<String, SymbolBook>,
    fills: Vec<Fill>,
}

impl PaperLedger {
    pub fn new(fee_rate: Decimal) -> Self {
        Self {
            fee_rate,
            ..Default::default()
        }
    }

    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    /// Every fill so far, oldest first
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn total_fees(&self) -> Decimal {
        self.books.values().map(|b| b.total_fees).sum()
    }

    /// Resolve the side and quantity a signal trades
    fn order_for(&self, signal: &Signal, symbol: &str) -> LedgerResult<(Side, Decimal)> {
        let held = self
            .books
            .get(symbol)
            .map(|b| b.quantity)
            .unwrap_or(Decimal::ZERO);

        match signal.action {
            SignalAction::Buy | SignalAction::Sell => {
                if signal.size <= Decimal::ZERO {
                    return Err(LedgerError::InvalidSize(signal.size.to_string()));
                }
                let side = if signal.action == SignalAction::Buy {
                    Side::Buy
                } else {
                    Side::Sell
                };
                Ok((side, signal.size))
            }
            SignalAction::CloseLong if held > Decimal::ZERO => Ok((Side::Sell, held)),
            SignalAction::CloseShort if held < Decimal::ZERO => Ok((Side::Buy, held.abs())),
            SignalAction::CloseLong | SignalAction::CloseShort => Err(LedgerError::NothingToClose(
                format!("{} with {} held in {}", signal.action, held, symbol),
            )),
        }
    }
}

impl PortfolioLedger for PaperLedger {
    fn execute(&mut self, signal: &Signal, mark: &MarketBar) -> LedgerResult<Fill> {
        let symbol = mark.symbol.as_str();
        let (side, quantity) = self.order_for(signal, symbol)?;
        let price = if signal.price > Decimal::ZERO {
            signal.price
        } else {
            mark.close
        };
        let fee = price * quantity * self.fee_rate;

        let book = self.books.entry(symbol.to_string()).or_default();
        let realized_pnl = book.apply_fill(side, quantity, price, fee);
        book.mark_price = mark.close;
        book.updated_at = Some(mark.timestamp);
        if !signal.action.is_close() {
            if signal.stop_loss.is_some() {
                book.stop_loss = signal.stop_loss;
            }
            if signal.take_profit.is_some() {
                book.take_profit = signal.take_profit;
            }
        }
        if book.quantity.is_zero() {
            book.stop_loss = None;
            book.take_profit = None;
        }

        let fill = Fill {
            symbol: symbol.to_string(),
            action: signal.action,
            side,
            quantity,
            price,
            fee,
            realized_pnl,
            timestamp: mark.timestamp,
        };
        log::info!(
            "[PaperLedger] {} {} {} @ {} (realized {}, position {})",
            fill.action,
            fill.quantity,
            symbol,
            fill.price,
            realized_pnl,
            book.quantity
        );
        self.fills.push(fill.clone());
        Ok(fill)
    }

    fn mark_to_market(&mut self, bar: &MarketBar) {
        if let Some(book) = self.books.get_mut(&bar.symbol) {
            book.mark_price = bar.close;
            book.updated_at = Some(bar.timestamp);
        }
    }

    fn snapshot(&self, symbol: &str) -> PositionSnapshot {
        match self.books.get(symbol) {
            Some(book) => book.snapshot(symbol),
            None => PositionSnapshot::flat(symbol, Decimal::ZERO, chrono::Utc::now()),
        }
    }

    fn positions(&self) -> Vec<PositionSnapshot> {
        self.books
            .iter()
            .map(|(symbol, book)| book.snapshot(symbol))
            .collect()
    }

    fn realized_pnl(&self) -> Decimal {
        self.books
            .values()
            .map(|b| b.realized_pnl - b.total_fees)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use relay_core::{PositionSide, SessionId};
    use rust_decimal_macros::dec;

    fn bar(minute: i64, close: Decimal) -> MarketBar {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        MarketBar::new(
            "MCL",
            start + Duration::minutes(minute),
            close,
            close,
            close,
            close,
            dec!(10),
        )
    }

    fn signal(action: SignalAction, price: Decimal, size: Decimal) -> Signal {
        Signal::new(action, price, size, SessionId::from("s"), Utc::now())
    }

    #[test]
    fn test_buy_opens_long() {
        let mut ledger = PaperLedger::default();
        let fill = ledger
            .execute(&signal(SignalAction::Buy, dec!(61.94), dec!(1)), &bar(10, dec!(61.90)))
            .unwrap();

        assert_eq!(fill.side, Side::Buy);
        assert_eq!(fill.price, dec!(61.94));

        let snap = ledger.snapshot("MCL");
        assert_eq!(snap.side, PositionSide::Long);
        assert_eq!(snap.quantity, dec!(1));
        assert_eq!(snap.entry_price, dec!(61.94));
        assert_eq!(snap.current_price, dec!(61.90));
    }

    #[test]
    fn test_zero_price_fills_at_close() {
        let mut ledger = PaperLedger::default();
        let fill = ledger
            .execute(&signal(SignalAction::Sell, dec!(0), dec!(2)), &bar(0, dec!(62)))
            .unwrap();
        assert_eq!(fill.price, dec!(62));
        assert_eq!(ledger.snapshot("MCL").side, PositionSide::Short);
    }

    #[test]
    fn test_close_long_flattens_whole_position() {
        let mut ledger = PaperLedger::default();
        ledger
            .execute(&signal(SignalAction::Buy, dec!(60), dec!(3)), &bar(0, dec!(60)))
            .unwrap();

        let fill = ledger
            .execute(&signal(SignalAction::CloseLong, dec!(61), dec!(1)), &bar(1, dec!(61)))
            .unwrap();
        assert_eq!(fill.quantity, dec!(3));
        assert_eq!(fill.realized_pnl, dec!(3));
        assert!(ledger.snapshot("MCL").is_flat());
        assert_eq!(ledger.realized_pnl(), dec!(3));
    }

    #[test]
    fn test_close_without_position_is_rejected() {
        let mut ledger = PaperLedger::default();
        let result = ledger.execute(&signal(SignalAction::CloseShort, dec!(60), dec!(1)), &bar(0, dec!(60)));
        assert!(matches!(result, Err(LedgerError::NothingToClose(_))));
        assert!(ledger.fills().is_empty());
    }

    #[test]
    fn test_invalid_size() {
        let mut ledger = PaperLedger::default();
        let result = ledger.execute(&signal(SignalAction::Buy, dec!(60), dec!(0)), &bar(0, dec!(60)));
        assert!(matches!(result, Err(LedgerError::InvalidSize(_))));
    }

    #[test]
    fn test_fees_and_mark_to_market() {
        let mut ledger = PaperLedger::new(dec!(0.001));
        let fill = ledger
            .execute(&signal(SignalAction::Buy, dec!(100), dec!(2)), &bar(0, dec!(100)))
            .unwrap();
        assert_eq!(fill.fee, dec!(0.2));
        assert_eq!(ledger.total_fees(), dec!(0.2));

        ledger.mark_to_market(&bar(1, dec!(105)));
        let snap = ledger.snapshot("MCL");
        assert_eq!(snap.current_price, dec!(105));
        assert_eq!(snap.pnl, dec!(10) - dec!(0.2));
    }

    #[test]
    fn test_unknown_symbol_is_flat() {
        let ledger = PaperLedger::default();
        assert!(ledger.snapshot("MES").is_flat());
        assert!(ledger.positions().is_empty());
    }
}
