//! Wire payloads carried inside `ChannelMessage`

use chrono::{DateTime, Utc};
use relay_core::{MarketBar, PositionSnapshot, SessionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request for a bootstrap window of bars ending at the replay position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDataRequest {
    pub request_id: String,
    pub symbol: String,
    pub bars_back: usize,
    pub timestamp: DateTime<Utc>,
}

impl HistoricalDataRequest {
    pub fn new(request_id: impl Into<String>, symbol: impl Into<String>, bars_back: usize) -> Self {
        Self {
            request_id: request_id.into(),
            symbol: symbol.into(),
            bars_back,
            timestamp: Utc::now(),
        }
    }
}

/// Compact OHLCV bar: `{t, o, h, l, c, v}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub t: DateTime<Utc>,
    pub o: Decimal,
    pub h: Decimal,
    pub l: Decimal,
    pub c: Decimal,
    pub v: Decimal,
}

impl HistoricalBar {
    pub fn into_market_bar(self, symbol: &str) -> MarketBar {
        MarketBar::new(symbol, self.t, self.o, self.h, self.l, self.c, self.v)
    }
}

impl From<&MarketBar> for HistoricalBar {
    fn from(bar: &MarketBar) -> Self {
        Self {
            t: bar.timestamp,
            o: bar.open,
            h: bar.high,
            l: bar.low,
            c: bar.close,
            v: bar.volume,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalBars {
    #[serde(default)]
    pub bars: Vec<HistoricalBar>,
}

/// Answer to a `HistoricalDataRequest`, correlated by `request_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDataResponse {
    pub request_id: String,
    pub success: bool,
    #[serde(default)]
    pub data: HistoricalBars,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistoricalDataResponse {
    /// Successful response; bars are sent in the order given
    pub fn ok(request_id: impl Into<String>, bars: &[MarketBar]) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            data: HistoricalBars {
                bars: bars.iter().map(HistoricalBar::from).collect(),
            },
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Explicit failure, never a synthetic series
    pub fn failed(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            data: HistoricalBars::default(),
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn into_market_bars(self, symbol: &str) -> Vec<MarketBar> {
        self.data
            .bars
            .into_iter()
            .map(|bar| bar.into_market_bar(symbol))
            .collect()
    }
}

/// Announcement that a session finished bootstrapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessRecord {
    pub session_id: SessionId,
    pub ready: bool,
    pub pid: u32,
    pub strategy_name: String,
    pub timestamp: DateTime<Utc>,
}

impl ReadinessRecord {
    pub fn ready(session_id: SessionId, strategy_name: impl Into<String>) -> Self {
        Self {
            session_id,
            ready: true,
            pid: std::process::id(),
            strategy_name: strategy_name.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Authoritative snapshot tagged with the bar that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub bar_index: usize,
    pub snapshot: PositionSnapshot,
}
