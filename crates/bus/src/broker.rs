//! Broker abstraction and the in-memory broker
//!
//! One tokio broadcast channel per channel name: every subscriber sees a
//! channel's messages in publish order. No serialization overhead.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use crate::envelope::ChannelMessage;
use crate::error::{BusError, Result};

/// Default per-channel buffer
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broker - moves envelopes between clients
///
/// The trait allows swapping in a networked broker later.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Establish (or re-establish) the connection
    async fn connect(&self) -> Result<()>;

    /// Publish to `msg.channel`
    async fn publish(&self, msg: ChannelMessage) -> Result<()>;

    /// Subscribe to one channel by exact name
    async fn subscribe(&self, channel: &str) -> Result<Subscription>;

    fn name(&self) -> &str {
        "Broker"
    }
}

/// Receiving end of one channel
pub struct Subscription {
    channel: String,
    rx: broadcast::Receiver<ChannelMessage>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, rx: broadcast::Receiver<ChannelMessage>) -> Self {
        Self {
            channel: channel.into(),
            rx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message
    pub async fn next(&mut self) -> Result<ChannelMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Ok(msg),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("[{}] subscriber lagged, skipped {}", self.channel, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(BusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive without blocking (returns None if no message available)
    pub fn try_next(&mut self) -> Result<Option<ChannelMessage>> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::warn!("[{}] subscriber lagged, skipped {}", self.channel, skipped);
                    continue;
                }
                Err(broadcast::error::TryRecvError::Closed) => return Err(BusError::ChannelClosed),
            }
        }
    }
}

/// Single-process broker backed by broadcast channels
///
/// Can be taken offline to simulate a dropped connection: while offline,
/// connect/publish/subscribe all fail with `NotConnected`.
pub struct InMemoryBroker {
    channels: DashMap<String, broadcast::Sender<ChannelMessage>>,
    online: AtomicBool,
    capacity: usize,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            online: AtomicBool::new(true),
            capacity: capacity.max(1),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        log::info!(
            "[InMemoryBroker] {}",
            if online { "online" } else { "offline" }
        );
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of live subscribers on a channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<ChannelMessage> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(BusError::NotConnected)
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn connect(&self) -> Result<()> {
        self.ensure_online()
    }

    async fn publish(&self, msg: ChannelMessage) -> Result<()> {
        self.ensure_online()?;
        let tx = self.sender(&msg.channel);
        // No subscribers is not an error: the message is simply not delivered
        let _ = tx.send(msg);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription> {
        self.ensure_online()?;
        Ok(Subscription::new(channel, self.sender(channel).subscribe()))
    }

    fn name(&self) -> &str {
        "InMemoryBroker"
    }
}
