//! Integration test: a multi-symbol trading session against the paper ledger

use chrono::{Duration, TimeZone, Utc};
use relay_core::{MarketBar, PositionSide, SessionId, Signal, SignalAction};
use relay_ledger::PaperLedger;
use relay_ports::PortfolioLedger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn bar(symbol: &str, minute: i64, close: Decimal) -> MarketBar {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
    MarketBar::new(symbol, start + Duration::minutes(minute), close, close, close, close, dec!(1))
}

fn signal(action: SignalAction, price: Decimal, size: Decimal) -> Signal {
    Signal::new(action, price, size, SessionId::from("s"), Utc::now())
}

#[test]
fn test_session_with_flip_and_two_symbols() {
    let mut ledger = PaperLedger::new(Decimal::ZERO);

    // MCL: long 1, then sell 2 -> short 1
    ledger
        .execute(&signal(SignalAction::Buy, dec!(61.94), dec!(1)), &bar("MCL", 0, dec!(61.94)))
        .unwrap();
    let flip = ledger
        .execute(&signal(SignalAction::Sell, dec!(62.94), dec!(2)), &bar("MCL", 1, dec!(62.94)))
        .unwrap();
    assert_eq!(flip.realized_pnl, dec!(1));

    // MES: short 1 via close price
    ledger
        .execute(&signal(SignalAction::Sell, dec!(0), dec!(1)), &bar("MES", 1, dec!(5100)))
        .unwrap();

    let positions = ledger.positions();
    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].symbol, "MCL");
    assert_eq!(positions[0].side, PositionSide::Short);
    assert_eq!(positions[0].entry_price, dec!(62.94));
    assert_eq!(positions[1].symbol, "MES");
    assert_eq!(positions[1].entry_price, dec!(5100));

    ledger
        .execute(&signal(SignalAction::CloseShort, dec!(0), dec!(0)), &bar("MCL", 2, dec!(61.94)))
        .unwrap();
    assert!(ledger.snapshot("MCL").is_flat());
    assert_eq!(ledger.fills().len(), 4);
    assert_eq!(ledger.realized_pnl(), dec!(2));
}
