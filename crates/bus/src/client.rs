//! Namespace-checked bus client

use relay_core::SessionId;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backoff::BackoffPolicy;
use crate::broker::{Broker, Subscription};
use crate::channels::ChannelPolicy;
use crate::envelope::ChannelMessage;
use crate::error::{BusError, Result};

/// A component's handle onto a broker
///
/// Publishing while disconnected fails fast with `NotConnected`; nothing is
/// queued. Recovery is the caller's decision via [`BusClient::reconnect`].
pub struct BusClient {
    name: String,
    broker: Arc<dyn Broker>,
    policy: ChannelPolicy,
    backoff: BackoffPolicy,
    session_id: SessionId,
    connected: AtomicBool,
}

impl BusClient {
    pub fn new(
        name: impl Into<String>,
        broker: Arc<dyn Broker>,
        policy: ChannelPolicy,
        session_id: SessionId,
    ) -> Self {
        Self {
            name: name.into(),
            broker,
            policy,
            backoff: BackoffPolicy::default(),
            session_id,
            connected: AtomicBool::new(false),
        }
    }

    /// Builder: Set reconnect backoff
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn policy(&self) -> &ChannelPolicy {
        &self.policy
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn connect(&self) -> Result<()> {
        self.broker.connect().await?;
        self.connected.store(true, Ordering::SeqCst);
        log::debug!("[{}] connected to {}", self.name, self.broker.name());
        Ok(())
    }

    /// Re-establish the connection with bounded exponential backoff
    ///
    /// Waits before every attempt. Exhausting the policy returns
    /// `ConnectionLost`.
    pub async fn reconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        let mut attempts = 0;

        for delay in self.backoff.delays() {
            attempts += 1;
            log::warn!(
                "[{}] reconnect attempt {}/{} in {:?}",
                self.name,
                attempts,
                self.backoff.max_attempts,
                delay
            );
            tokio::time::sleep(delay).await;

            match self.broker.connect().await {
                Ok(()) => {
                    self.connected.store(true, Ordering::SeqCst);
                    log::info!("[{}] reconnected after {} attempts", self.name, attempts);
                    return Ok(());
                }
                Err(e) => log::debug!("[{}] reconnect attempt {} failed: {}", self.name, attempts, e),
            }
        }

        log::error!("[{}] connection lost after {} attempts", self.name, attempts);
        Err(BusError::ConnectionLost { attempts })
    }

    /// Publish a raw payload
    pub async fn publish(
        &self,
        channel: &str,
        payload: Value,
        correlation_id: Option<String>,
    ) -> Result<()> {
        self.policy.check(channel)?;
        let mut msg = ChannelMessage::new(channel, payload, self.session_id.clone());
        msg.correlation_id = correlation_id;
        self.send(msg).await
    }

    /// Serialize and publish a typed payload
    pub async fn publish_typed<T: Serialize>(
        &self,
        channel: &str,
        payload: &T,
        correlation_id: Option<String>,
    ) -> Result<()> {
        self.policy.check(channel)?;
        let value =
            serde_json::to_value(payload).map_err(|e| BusError::Serialization(e.to_string()))?;
        self.publish(channel, value, correlation_id).await
    }

    /// Publish an already-built envelope unchanged
    pub async fn forward(&self, msg: ChannelMessage) -> Result<()> {
        self.policy.check(&msg.channel)?;
        self.send(msg).await
    }

    pub async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        self.policy.check(channel)?;
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        self.broker.subscribe(channel).await
    }

    async fn send(&self, msg: ChannelMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }
        let result = self.broker.publish(msg).await;
        if let Err(BusError::NotConnected) = result {
            self.connected.store(false, Ordering::SeqCst);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::channels::Channels;
    use serde_json::json;

    fn client(broker: Arc<InMemoryBroker>, policy: ChannelPolicy) -> BusClient {
        BusClient::new("test", broker, policy, "s-1".into())
    }

    #[tokio::test]
    async fn test_not_connected_fails_fast() {
        let broker = Arc::new(InMemoryBroker::new());
        let client = client(broker, ChannelPolicy::local());

        let result = client
            .publish(Channels::LOCAL_SIGNAL, json!({}), None)
            .await;
        assert_eq!(result, Err(BusError::NotConnected));
    }

    #[tokio::test]
    async fn test_policy_checked_before_connection() {
        let broker = Arc::new(InMemoryBroker::new());
        let client = client(broker, ChannelPolicy::local());

        let result = client
            .publish(Channels::STRATEGY_READY, json!({}), None)
            .await;
        assert!(matches!(result, Err(BusError::NamespaceViolation { .. })));
        assert!(matches!(
            client.subscribe(Channels::HISTORY_REQUEST).await,
            Err(BusError::NamespaceViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_publish_carries_session_and_correlation() {
        let broker = Arc::new(InMemoryBroker::new());
        let client = client(broker, ChannelPolicy::global());
        client.connect().await.unwrap();

        let mut sub = client.subscribe(Channels::HISTORY_REQUEST).await.unwrap();
        client
            .publish(Channels::HISTORY_REQUEST, json!({"x": 1}), Some("r-1".into()))
            .await
            .unwrap();

        let msg = sub.next().await.unwrap();
        assert_eq!(msg.session_id.as_str(), "s-1");
        assert_eq!(msg.correlation_id.as_deref(), Some("r-1"));
        assert_eq!(msg.payload, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_broker_drop_marks_disconnected() {
        let broker = Arc::new(InMemoryBroker::new());
        let client = client(broker.clone(), ChannelPolicy::global());
        client.connect().await.unwrap();

        broker.set_online(false);
        let result = client
            .publish(Channels::STRATEGY_READY, json!({}), None)
            .await;

        assert_eq!(result, Err(BusError::NotConnected));
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_succeeds_when_broker_returns() {
        let broker = Arc::new(InMemoryBroker::new());
        let client = client(broker.clone(), ChannelPolicy::global());
        client.connect().await.unwrap();

        broker.set_online(false);
        let flipper = {
            let broker = broker.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(120)).await;
                broker.set_online(true);
            })
        };

        let start = tokio::time::Instant::now();
        client.reconnect().await.unwrap();
        flipper.await.unwrap();

        // 50ms fails, 100ms more then succeeds at 150ms
        let elapsed = start.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(150));
        assert!(elapsed < std::time::Duration::from_millis(200));
        assert!(client.is_connected());
    }
}
