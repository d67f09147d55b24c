//! Native payload -> canonical `Signal`
//!
//! Strategies name their fields however they like. The translator knows the
//! common aliases, fills gaps from the bar and the configured default size,
//! and keeps the untouched payload in `raw`.

use relay_bus::{Channels, ProtocolError};
use relay_core::{MarketBar, SessionId, Signal, SignalAction};
use relay_strategy::NativeSignal;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

const ACTION_KEYS: &[&str] = &["action", "direction", "side", "signal"];
const PRICE_KEYS: &[&str] = &["price", "entry", "entryPrice", "entry_price", "limit"];
const SIZE_KEYS: &[&str] = &["size", "quantity", "qty", "contracts"];
const STOP_KEYS: &[&str] = &["stopLoss", "stop_loss", "sl", "stop"];
const TARGET_KEYS: &[&str] = &["takeProfit", "take_profit", "tp", "target"];

#[derive(Debug, Clone)]
pub struct SignalTranslator {
    default_size: Decimal,
}

impl SignalTranslator {
    pub fn new(default_size: Decimal) -> Self {
        Self { default_size }
    }

    pub fn translate(
        &self,
        native: &NativeSignal,
        bar: &MarketBar,
        session_id: &SessionId,
    ) -> Result<Signal, ProtocolError> {
        let (key, value) = lookup(native, ACTION_KEYS).ok_or_else(|| malformed("no action field"))?;
        let action = value
            .as_str()
            .and_then(parse_action)
            .ok_or_else(|| malformed(format!("unrecognized {} {}", key, value)))?;

        let price = decimal_field(native, PRICE_KEYS)?.unwrap_or(bar.close);
        let size = decimal_field(native, SIZE_KEYS)?.unwrap_or(self.default_size);
        if size <= Decimal::ZERO {
            return Err(malformed(format!("non-positive size {}", size)));
        }

        let mut signal = Signal::new(action, price, size, session_id.clone(), bar.timestamp)
            .with_raw(native.clone().into_value());
        if let Some(stop) = decimal_field(native, STOP_KEYS)? {
            signal = signal.with_stop_loss(stop);
        }
        if let Some(target) = decimal_field(native, TARGET_KEYS)? {
            signal = signal.with_take_profit(target);
        }
        Ok(signal)
    }
}

impl Default for SignalTranslator {
    fn default() -> Self {
        Self::new(Decimal::ONE)
    }
}

fn malformed(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed {
        channel: Channels::LOCAL_SIGNAL.to_string(),
        reason: reason.into(),
    }
}

/// First non-null field among `keys`
fn lookup<'a>(native: &'a NativeSignal, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter()
        .find_map(|key| native.get(key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn decimal_field(native: &NativeSignal, keys: &[&'static str]) -> Result<Option<Decimal>, ProtocolError> {
    match lookup(native, keys) {
        None => Ok(None),
        Some((key, value)) => parse_decimal(value)
            .map(Some)
            .ok_or_else(|| malformed(format!("{} is not a number: {}", key, value))),
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn parse_action(raw: &str) -> Option<SignalAction> {
    let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
    match normalized.as_str() {
        "buy" | "long" => Some(SignalAction::Buy),
        "sell" | "short" => Some(SignalAction::Sell),
        "close_long" | "exit_long" | "sell_to_close" => Some(SignalAction::CloseLong),
        "close_short" | "exit_short" | "buy_to_cover" | "cover" => Some(SignalAction::CloseShort),
        _ => None,
    }
}
