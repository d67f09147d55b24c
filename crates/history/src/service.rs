//! Historical bootstrap service

use relay_bus::{
    BusClient, ChannelMessage, Channels, HistoricalDataRequest, HistoricalDataResponse,
    Subscription,
};
use relay_clock::ReplayClock;
use relay_ports::{DataError, MarketDataSource};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::stats::ServiceStats;

/// Answers bootstrap requests from a shared, read-only dataset
///
/// The replay position is read from the controller's `ReplayClock`; the
/// service never moves it.
#[derive(Clone)]
pub struct HistoricalBootstrapService {
    dataset: Arc<dyn MarketDataSource>,
    clock: ReplayClock,
    stats: Arc<ServiceStats>,
}

impl HistoricalBootstrapService {
    pub fn new(dataset: Arc<dyn MarketDataSource>, clock: ReplayClock) -> Self {
        Self {
            dataset,
            clock,
            stats: Arc::new(ServiceStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ServiceStats> {
        self.stats.clone()
    }

    /// Resolve one request against the current replay index
    ///
    /// Window is `[max(0, idx - barsBack), idx)` with `idx` clamped to the
    /// series length. A short series is truncated, never padded.
    pub fn handle(&self, request: &HistoricalDataRequest) -> HistoricalDataResponse {
        self.stats.record_request();

        let Some(len) = self.dataset.len(&request.symbol) else {
            let error = DataError::SymbolNotFound(request.symbol.clone());
            log::warn!("[HistoryService] {}: {}", request.request_id, error);
            self.stats.record_response(false);
            return HistoricalDataResponse::failed(&request.request_id, error.to_string());
        };

        let end = self.clock.index().min(len);
        let start = end.saturating_sub(request.bars_back);

        let response = match self.dataset.get_slice(&request.symbol, start, end) {
            Ok(bars) => {
                log::debug!(
                    "[HistoryService] {}: {} bars of {} [{}, {})",
                    request.request_id,
                    bars.len(),
                    request.symbol,
                    start,
                    end
                );
                HistoricalDataResponse::ok(&request.request_id, &bars)
            }
            Err(e) => {
                log::warn!("[HistoryService] {}: {}", request.request_id, e);
                HistoricalDataResponse::failed(&request.request_id, e.to_string())
            }
        };
        self.stats.record_response(response.success);
        response
    }

    /// Serve requests until shutdown
    ///
    /// Malformed requests are logged and dropped. A lost connection is
    /// retried with the client's backoff; the loop only exits on shutdown,
    /// a closed request channel or `ConnectionLost`.
    pub async fn run(self, client: BusClient, shutdown: broadcast::Receiver<()>) -> Result<()> {
        let requests = client.subscribe(Channels::HISTORY_REQUEST).await?;
        self.serve(client, requests, shutdown).await
    }

    /// Subscribe, then serve on a spawned task
    ///
    /// Requests published after this returns are never missed.
    pub async fn start(
        self,
        client: BusClient,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<Result<()>>> {
        let requests = client.subscribe(Channels::HISTORY_REQUEST).await?;
        Ok(tokio::spawn(self.serve(client, requests, shutdown)))
    }

    async fn serve(
        self,
        client: BusClient,
        mut requests: Subscription,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        log::info!("[HistoryService] serving {}", Channels::HISTORY_REQUEST);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    log::info!("[HistoryService] shutting down: {:?}", self.stats.snapshot());
                    return Ok(());
                }
                msg = requests.next() => {
                    let msg = msg?;
                    self.respond(&client, msg).await?;
                }
            }
        }
    }

    async fn respond(&self, client: &BusClient, msg: ChannelMessage) -> Result<()> {
        let request: HistoricalDataRequest = match msg.decode() {
            Ok(request) => request,
            Err(e) => {
                log::warn!("[HistoryService] dropping request: {}", e);
                self.stats.record_malformed();
                return Ok(());
            }
        };

        let response = self.handle(&request);
        // Reply is addressed to the requesting session
        let reply = ChannelMessage::encode(Channels::HISTORY_RESPONSE, &response, msg.session_id)?
            .with_correlation(&request.request_id);
        self.send(client, reply).await
    }

    /// Forward a reply, resending it once after a reconnect
    async fn send(&self, client: &BusClient, reply: ChannelMessage) -> Result<()> {
        let error = match client.forward(reply.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        self.stats.record_send_failure();
        let request_id = reply.correlation_id.clone().unwrap_or_default();

        if !error.is_connection() {
            log::warn!("[HistoryService] reply {} dropped: {}", request_id, error);
            return Ok(());
        }

        log::warn!("[HistoryService] reply {} failed: {}, reconnecting", request_id, error);
        client.reconnect().await?;
        if let Err(e) = client.forward(reply).await {
            self.stats.record_send_failure();
            log::warn!("[HistoryService] reply {} lost after reconnect: {}", request_id, e);
        }
        Ok(())
    }
}
