use relay_bus::{BusClient, BusError, Channels, ReadinessRecord};
use std::sync::atomic::{AtomicBool, Ordering};

/// Publishes a session's readiness record, once
///
/// The client it wraps should be scoped to `Channels::STRATEGY_READY` only.
pub struct ReadinessAnnouncer {
    client: BusClient,
    announced: AtomicBool,
}

impl ReadinessAnnouncer {
    pub fn new(client: BusClient) -> Self {
        Self {
            client,
            announced: AtomicBool::new(false),
        }
    }

    pub async fn connect(&self) -> Result<(), BusError> {
        self.client.connect().await
    }

    pub fn is_announced(&self) -> bool {
        self.announced.load(Ordering::SeqCst)
    }

    /// Returns false if this session already announced
    pub async fn announce(&self, strategy_name: &str) -> Result<bool, BusError> {
        if self.is_announced() {
            return Ok(false);
        }

        let record = ReadinessRecord::ready(self.client.session_id().clone(), strategy_name);
        self.client
            .publish_typed(Channels::STRATEGY_READY, &record, None)
            .await?;
        self.announced.store(true, Ordering::SeqCst);
        log::info!(
            "[{}] ready: {} (pid {})",
            record.session_id,
            strategy_name,
            record.pid
        );
        Ok(true)
    }
}
