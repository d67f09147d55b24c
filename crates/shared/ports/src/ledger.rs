use relay_core::{Fill, MarketBar, PositionSnapshot, Signal};
use rust_decimal::Decimal;

use crate::error::LedgerResult;

/// Port for the authoritative portfolio
///
/// Owned by the backtest controller; strategies never touch it directly.
pub trait PortfolioLedger: Send + Sync {
    /// Execute a canonical signal against the bar it was decided on
    fn execute(&mut self, signal: &Signal, mark: &MarketBar) -> LedgerResult<Fill>;

    /// Re-price open positions at the bar close
    fn mark_to_market(&mut self, bar: &MarketBar);

    /// Current snapshot for one symbol (flat if never traded)
    fn snapshot(&self, symbol: &str) -> PositionSnapshot;

    /// Snapshots of every symbol traded so far
    fn positions(&self) -> Vec<PositionSnapshot>;

    /// Realized pnl net of fees
    fn realized_pnl(&self) -> Decimal;
}
