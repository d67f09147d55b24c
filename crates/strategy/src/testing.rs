//! Test doubles shared by the unit tests

use chrono::{Duration, TimeZone, Utc};
use relay_core::{MarketBar, PositionSnapshot};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bot::{RiskCheck, TradingBot};
use crate::strategy::NativeSignal;

#[derive(Default)]
pub struct StubBot {
    positions: Mutex<HashMap<String, PositionSnapshot>>,
    quiet: AtomicBool,
}

impl StubBot {
    pub fn shared() -> Arc<StubBot> {
        Arc::new(StubBot::default())
    }

    pub fn set_position(&self, snapshot: PositionSnapshot) {
        self.positions
            .lock()
            .unwrap()
            .insert(snapshot.symbol.clone(), snapshot);
    }
}

impl TradingBot for StubBot {
    fn position(&self, symbol: &str) -> Option<PositionSnapshot> {
        self.positions.lock().unwrap().get(symbol).cloned()
    }

    fn positions(&self) -> Vec<PositionSnapshot> {
        self.positions.lock().unwrap().values().cloned().collect()
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    fn check_risk(&self, _signal: &NativeSignal) -> RiskCheck {
        RiskCheck::passed()
    }
}

/// MCL bar `minute` minutes into the session, flat at `close`
pub fn bar(minute: i64, close: Decimal) -> MarketBar {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
    MarketBar::new(
        "MCL",
        start + Duration::minutes(minute),
        close,
        close,
        close,
        close,
        Decimal::ONE_HUNDRED,
    )
}
