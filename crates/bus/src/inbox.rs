//! Single-consumer inbox over several subscriptions
//!
//! Each attached subscription gets a forwarder task feeding one bounded mpsc
//! queue. Messages of one channel keep their publish order; no ordering is
//! promised across channels.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broker::Subscription;
use crate::envelope::ChannelMessage;
use crate::error::{BusError, Result};

pub struct Inbox {
    name: String,
    tx: mpsc::Sender<ChannelMessage>,
    rx: mpsc::Receiver<ChannelMessage>,
    forwarders: Vec<JoinHandle<()>>,
}

impl Inbox {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            name: name.into(),
            tx,
            rx,
            forwarders: Vec::new(),
        }
    }

    /// Start draining `subscription` into this inbox
    pub fn attach(&mut self, mut subscription: Subscription) {
        let tx = self.tx.clone();
        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            loop {
                match subscription.next().await {
                    Ok(msg) => {
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::debug!("[{}] {} closed: {}", name, subscription.channel(), e);
                        break;
                    }
                }
            }
        });
        self.forwarders.push(handle);
    }

    /// Next message in arrival order
    pub async fn recv(&mut self) -> Result<ChannelMessage> {
        self.rx.recv().await.ok_or(BusError::ChannelClosed)
    }

    /// Next message, or `Timeout` after `timeout`
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<ChannelMessage> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(BusError::ChannelClosed),
            Err(_) => Err(BusError::Timeout),
        }
    }

    /// Drain whatever is already queued
    pub fn try_recv(&mut self) -> Option<ChannelMessage> {
        self.rx.try_recv().ok()
    }

    /// Stop every forwarder, releasing its subscription
    pub fn close(&mut self) {
        for handle in self.forwarders.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.close();
    }
}
