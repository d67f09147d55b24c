//! Strategy trait and native payloads

use relay_core::MarketBar;
use serde_json::{Map, Value};

use crate::error::Result;

/// A strategy's decision in its own dialect
///
/// Any JSON object; field names are not constrained here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeSignal(Map<String, Value>);

impl NativeSignal {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder: Set a field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for NativeSignal {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Strategy trait - implement this for your trading strategy
///
/// Hooks are synchronous: the host only suspends on bus I/O, never inside
/// decision logic.
pub trait Strategy: Send {
    /// Strategy name for logging and readiness records
    fn name(&self) -> &str;

    /// Called once with the bootstrap window, oldest bar first
    fn initialize(&mut self, history: &[MarketBar]) -> Result<()>;

    /// Called for every replayed bar; `None` (or an empty payload) means no trade
    fn on_bar(&mut self, bar: &MarketBar) -> Option<NativeSignal>;

    /// Called on shutdown to cleanup (optional)
    fn on_shutdown(&mut self) {}
}
