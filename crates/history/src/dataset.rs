//! In-memory bar dataset
//!
//! JSON layout: `{"MCL": [{"timestamp": ..., "open": ..., ...}, ...], "MES": [...]}`.
//! Compact `{t, o, h, l, c, v}` keys are accepted too.

use chrono::{DateTime, Utc};
use relay_core::MarketBar;
use relay_ports::{DataError, DataResult, MarketDataSource};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{HistoryError, Result};

#[derive(Debug, Deserialize)]
struct DatasetBar {
    #[serde(alias = "t")]
    timestamp: DateTime<Utc>,
    #[serde(alias = "o")]
    open: Decimal,
    #[serde(alias = "h")]
    high: Decimal,
    #[serde(alias = "l")]
    low: Decimal,
    #[serde(alias = "c")]
    close: Decimal,
    #[serde(alias = "v", default)]
    volume: Decimal,
}

/// Ordered bar series per symbol, read-only once built
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    series: HashMap<String, Vec<MarketBar>>,
}

impl InMemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| HistoryError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<DatasetBar>> =
            serde_json::from_str(json).map_err(|e| HistoryError::Parse(e.to_string()))?;

        let mut dataset = Self::new();
        for (symbol, bars) in raw {
            let bars = bars
                .into_iter()
                .map(|b| MarketBar::new(&symbol, b.timestamp, b.open, b.high, b.low, b.close, b.volume))
                .collect();
            dataset.insert(symbol, bars);
        }
        Ok(dataset)
    }

    /// Add (or replace) a symbol's series, sorted ascending by timestamp
    pub fn insert(&mut self, symbol: impl Into<String>, mut bars: Vec<MarketBar>) {
        let symbol = symbol.into();
        bars.sort_by_key(|b| b.timestamp);
        let inconsistent = bars.iter().filter(|b| !b.is_consistent()).count();
        if inconsistent > 0 {
            log::warn!(
                "[InMemoryDataset] {} has {} bars with inconsistent OHLC",
                symbol,
                inconsistent
            );
        }
        log::debug!("[InMemoryDataset] loaded {} bars for {}", bars.len(), symbol);
        self.series.insert(symbol, bars);
    }

    /// Full series for a symbol
    pub fn series(&self, symbol: &str) -> Option<&[MarketBar]> {
        self.series.get(symbol).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl MarketDataSource for InMemoryDataset {
    fn get_slice(&self, symbol: &str, start: usize, end: usize) -> DataResult<Vec<MarketBar>> {
        let bars = self
            .series
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;

        if start > end || end > bars.len() {
            return Err(DataError::InvalidRange {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(bars[start..end].to_vec())
    }

    fn len(&self, symbol: &str) -> Option<usize> {
        self.series.get(symbol).map(Vec::len)
    }

    fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}
