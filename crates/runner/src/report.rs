use relay_core::{Fill, PositionSnapshot, SessionId};
use relay_host::SessionSummary;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::state::ControllerState;

/// Outcome of one backtest session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub session_id: SessionId,
    /// Final controller state
    pub status: ControllerState,
    /// Fatal error that forced shutdown, if any
    pub error: Option<String>,
    pub bars_published: usize,
    pub signals_received: usize,
    pub signals_executed: usize,
    pub late_signals: usize,
    pub duplicate_signals: usize,
    /// Signals seen before readiness, malformed, or refused by the ledger
    pub rejected_signals: usize,
    pub fills: Vec<Fill>,
    pub final_positions: Vec<PositionSnapshot>,
    /// Net of fees
    pub realized_pnl: Decimal,
    /// Host-side counters, when the session stopped cleanly
    pub session: Option<SessionSummary>,
}

impl BacktestReport {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            status: ControllerState::Idle,
            error: None,
            bars_published: 0,
            signals_received: 0,
            signals_executed: 0,
            late_signals: 0,
            duplicate_signals: 0,
            rejected_signals: 0,
            fills: Vec::new(),
            final_positions: Vec::new(),
            realized_pnl: Decimal::ZERO,
            session: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ControllerState::Shutdown && self.error.is_none()
    }
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {} finished in {}", self.session_id, self.status)?;
        if let Some(error) = &self.error {
            writeln!(f, "  error:    {}", error)?;
        }
        writeln!(f, "  bars:     {}", self.bars_published)?;
        writeln!(
            f,
            "  signals:  {} received, {} executed, {} late, {} duplicate, {} rejected",
            self.signals_received,
            self.signals_executed,
            self.late_signals,
            self.duplicate_signals,
            self.rejected_signals
        )?;
        writeln!(f, "  fills:    {}", self.fills.len())?;
        for position in &self.final_positions {
            writeln!(
                f,
                "  position: {} {:?} {} @ {} (pnl {})",
                position.symbol, position.side, position.quantity, position.entry_price, position.pnl
            )?;
        }
        write!(f, "  realized: {}", self.realized_pnl)
    }
}
