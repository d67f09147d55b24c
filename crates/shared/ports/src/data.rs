use relay_core::MarketBar;

use crate::error::DataResult;

/// Port for ordered historical bars
///
/// Indices are positions in the per-symbol series, oldest first.
pub trait MarketDataSource: Send + Sync {
    /// Bars in `[start, end)` for `symbol`
    fn get_slice(&self, symbol: &str, start: usize, end: usize) -> DataResult<Vec<MarketBar>>;

    /// Number of bars available for `symbol`, `None` if unknown
    fn len(&self, symbol: &str) -> Option<usize>;

    /// Bar at `index`, if any
    fn bar_at(&self, symbol: &str, index: usize) -> Option<MarketBar> {
        self.get_slice(symbol, index, index + 1).ok()?.into_iter().next()
    }

    /// All symbols this source knows about
    fn symbols(&self) -> Vec<String>;
}
