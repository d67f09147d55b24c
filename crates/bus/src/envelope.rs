//! The envelope every bus message travels in

use chrono::{DateTime, Utc};
use relay_core::SessionId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{BusError, ProtocolError, Result};

/// A message on a named channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessage {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub payload: Value,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
}

impl ChannelMessage {
    pub fn new(channel: impl Into<String>, payload: Value, session_id: SessionId) -> Self {
        Self {
            channel: channel.into(),
            correlation_id: None,
            payload,
            session_id,
            timestamp: Utc::now(),
        }
    }

    /// Serialize a typed payload into an envelope
    pub fn encode<T: Serialize>(
        channel: impl Into<String>,
        payload: &T,
        session_id: SessionId,
    ) -> Result<Self> {
        let value =
            serde_json::to_value(payload).map_err(|e| BusError::Serialization(e.to_string()))?;
        Ok(Self::new(channel, value, session_id))
    }

    /// Builder: Set correlation id
    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Copy of this message addressed to another channel
    pub fn rerouted(&self, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..self.clone()
        }
    }

    /// Deserialize the payload
    pub fn decode<T: DeserializeOwned>(&self) -> std::result::Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(|e| ProtocolError::Malformed {
            channel: self.channel.clone(),
            reason: e.to_string(),
        })
    }

    /// JSON wire form
    pub fn to_wire(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| BusError::Serialization(e.to_string()))
    }

    /// Parse the JSON wire form
    pub fn from_wire(raw: &str) -> std::result::Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed {
            channel: "<wire>".to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::MarketBar;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bar_round_trip_through_wire() {
        let bar = MarketBar::new(
            "MCL",
            Utc::now(),
            dec!(61.90),
            dec!(62.05),
            dec!(61.80),
            dec!(61.94),
            dec!(1200),
        );
        let msg = ChannelMessage::encode("strategy:market-data", &bar, "s".into())
            .unwrap()
            .with_correlation("c-1");

        let parsed = ChannelMessage::from_wire(&msg.to_wire().unwrap()).unwrap();

        assert_eq!(parsed, msg);
        assert_eq!(parsed.decode::<MarketBar>().unwrap(), bar);
    }

    #[test]
    fn test_decode_reports_channel() {
        let msg = ChannelMessage::new("strategy:signal", serde_json::json!([1, 2]), "s".into());
        let err = msg.decode::<MarketBar>().unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { channel, .. } if channel == "strategy:signal"));
    }
}
