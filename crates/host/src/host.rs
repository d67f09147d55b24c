//! Strategy Host - runs one strategy unit and manages its lifecycle
//!
//! The host handles:
//! - Loading the unit through the registry
//! - The bootstrap handshake and readiness announcement
//! - Feeding bars to the unit and publishing translated signals
//! - Shutdown and subscription release

use relay_bus::{
    Broker, BusClient, BusError, ChannelMessage, ChannelPolicy, Channels, HistoricalDataRequest,
    HistoricalDataResponse, InMemoryBroker, Inbox, PositionUpdate, ProtocolError,
};
use relay_core::{MarketBar, SessionId};
use relay_strategy::{Strategy, StrategyConfig, StrategyRegistry, TradingBot};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::proxy::CapabilityProxy;
use crate::readiness::ReadinessAnnouncer;
use crate::translate::SignalTranslator;

/// Counters reported when a session ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub bars_seen: usize,
    pub signals_emitted: usize,
    pub protocol_errors: usize,
    /// Bars that arrived while still bootstrapping
    pub dropped_before_ready: usize,
}

pub struct StrategyHost {
    session_id: SessionId,
    /// Strategy configuration (symbol and bootstrap window)
    config: StrategyConfig,
    host_config: HostConfig,
    /// The loaded unit
    strategy: Box<dyn Strategy>,
    /// Capabilities handed to the unit; also owns the local<->global bridge
    proxy: Arc<CapabilityProxy>,
    /// Local-namespace client for signals and bootstrap requests
    local: BusClient,
    announcer: ReadinessAnnouncer,
    translator: SignalTranslator,
    /// Single inbox for every local inbound channel
    inbox: Inbox,
    pump: Option<JoinHandle<()>>,
    ready: bool,
    summary: SessionSummary,
}

impl StrategyHost {
    /// Build an isolated session around one strategy unit
    ///
    /// The session gets its own local broker; only the proxy and the readiness
    /// announcer touch `global`. Registry errors surface here, before any I/O.
    pub fn load(
        registry: &StrategyRegistry,
        config: StrategyConfig,
        host_config: HostConfig,
        session_id: SessionId,
        global: Arc<dyn Broker>,
    ) -> Result<Self> {
        let local_broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::with_capacity(host_config.inbox_capacity));

        let proxy = Arc::new(CapabilityProxy::new(
            session_id.clone(),
            BusClient::new(
                format!("{}:proxy-local", session_id),
                local_broker.clone(),
                ChannelPolicy::local(),
                session_id.clone(),
            ),
            BusClient::new(
                format!("{}:proxy-global", session_id),
                global.clone(),
                ChannelPolicy::session(&session_id),
                session_id.clone(),
            )
            .with_backoff(host_config.backoff),
        ));

        let strategy = registry.load(config.clone(), proxy.clone())?;

        let announcer = ReadinessAnnouncer::new(BusClient::new(
            format!("{}:ready", session_id),
            global,
            ChannelPolicy::only(Channels::STRATEGY_READY),
            session_id.clone(),
        ));
        let local = BusClient::new(
            format!("{}:host", session_id),
            local_broker,
            ChannelPolicy::local(),
            session_id.clone(),
        );

        log::info!(
            "[{}] loaded {} for {} ({} bars back)",
            session_id,
            strategy.name(),
            config.symbol,
            config.bars_back
        );

        Ok(Self {
            translator: SignalTranslator::new(host_config.default_size),
            inbox: Inbox::new(format!("{}:host", session_id), host_config.inbox_capacity),
            session_id,
            config,
            host_config,
            strategy,
            proxy,
            local,
            announcer,
            pump: None,
            ready: false,
            summary: SessionSummary::default(),
        })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn proxy(&self) -> &Arc<CapabilityProxy> {
        &self.proxy
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Connect, bootstrap, initialize the unit, then announce readiness
    pub async fn start(&mut self) -> Result<()> {
        self.proxy.connect().await?;
        self.local.connect().await?;
        self.announcer.connect().await?;

        self.pump = Some(self.proxy.start(self.host_config.inbox_capacity).await?);
        for channel in [
            Channels::LOCAL_MARKET_DATA,
            Channels::LOCAL_POSITION_UPDATE,
            Channels::LOCAL_HISTORY_RESPONSE,
        ] {
            self.inbox.attach(self.local.subscribe(channel).await?);
        }

        let history = self.bootstrap().await?;
        log::info!(
            "[{}] bootstrap window: {} bars of {}",
            self.session_id,
            history.len(),
            self.config.symbol
        );
        self.strategy.initialize(&history)?;

        self.announcer.announce(self.strategy.name()).await?;
        self.ready = true;
        Ok(())
    }

    /// Issue the single bootstrap request and wait for its response
    async fn bootstrap(&mut self) -> Result<Vec<MarketBar>> {
        let request_id = Uuid::new_v4().to_string();
        let request = HistoricalDataRequest::new(&request_id, &self.config.symbol, self.config.bars_back);
        self.local
            .publish_typed(Channels::LOCAL_HISTORY_REQUEST, &request, Some(request_id.clone()))
            .await?;

        let timeout = self.host_config.bootstrap_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match self.inbox.recv_timeout(remaining).await {
                Ok(msg) => msg,
                Err(BusError::Timeout) => {
                    return Err(HostError::BootstrapTimeout {
                        request_id,
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            match msg.channel.as_str() {
                Channels::LOCAL_HISTORY_RESPONSE => {
                    let response: HistoricalDataResponse = match msg.decode() {
                        Ok(response) => response,
                        Err(e) => {
                            self.protocol_error(e);
                            continue;
                        }
                    };
                    if response.request_id != request_id {
                        self.protocol_error(ProtocolError::CorrelationMismatch {
                            expected: request_id.clone(),
                            actual: response.request_id,
                        });
                        continue;
                    }
                    if !response.success {
                        return Err(HostError::BootstrapRejected {
                            request_id,
                            reason: response.error.unwrap_or_default(),
                        });
                    }
                    return Ok(response.into_market_bars(&self.config.symbol));
                }
                Channels::LOCAL_MARKET_DATA => {
                    self.summary.dropped_before_ready += 1;
                    log::warn!("[{}] bar received before ready, dropped", self.session_id);
                }
                other => log::debug!("[{}] ignoring {} while bootstrapping", self.session_id, other),
            }
        }
    }

    /// Dispatch inbox messages until `shutdown` fires (or its sender drops)
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) -> Result<SessionSummary> {
        log::info!("[{}] {} streaming", self.session_id, self.strategy.name());

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                msg = self.inbox.recv() => match msg {
                    Ok(msg) => {
                        if let Err(e) = self.dispatch(msg).await {
                            break Err(e);
                        }
                    }
                    Err(e) => break Err(e.into()),
                },
            }
        };

        self.stop();
        result.map(|_| self.summary.clone())
    }

    async fn dispatch(&mut self, msg: ChannelMessage) -> Result<()> {
        match msg.channel.as_str() {
            Channels::LOCAL_MARKET_DATA => match msg.decode::<MarketBar>() {
                Ok(bar) => self.on_bar(bar).await,
                Err(e) => {
                    self.protocol_error(e);
                    Ok(())
                }
            },
            Channels::LOCAL_POSITION_UPDATE => {
                if let Ok(update) = msg.decode::<PositionUpdate>() {
                    log::debug!(
                        "[{}] bar {}: {} {:?} {}",
                        self.session_id,
                        update.bar_index,
                        update.snapshot.symbol,
                        update.snapshot.side,
                        update.snapshot.quantity
                    );
                }
                Ok(())
            }
            Channels::LOCAL_HISTORY_RESPONSE => {
                self.protocol_error(ProtocolError::CorrelationMismatch {
                    expected: "none".to_string(),
                    actual: msg.correlation_id.unwrap_or_default(),
                });
                Ok(())
            }
            other => {
                self.protocol_error(ProtocolError::UnknownChannel(other.to_string()));
                Ok(())
            }
        }
    }

    async fn on_bar(&mut self, bar: MarketBar) -> Result<()> {
        self.summary.bars_seen += 1;

        let Some(native) = self.strategy.on_bar(&bar) else {
            return Ok(());
        };
        if native.is_empty() {
            return Ok(());
        }

        let signal = match self.translator.translate(&native, &bar, &self.session_id) {
            Ok(signal) => signal,
            Err(e) => {
                self.protocol_error(e);
                return Ok(());
            }
        };

        self.local
            .publish_typed(Channels::LOCAL_SIGNAL, &signal, Some(signal.idempotency_key()))
            .await?;
        self.summary.signals_emitted += 1;
        if !self.proxy.is_quiet() {
            log::info!(
                "[{}] {} {} @ {} x {}",
                self.session_id,
                bar.timestamp,
                signal.action,
                signal.price,
                signal.size
            );
        }
        Ok(())
    }

    fn protocol_error(&mut self, error: ProtocolError) {
        self.summary.protocol_errors += 1;
        log::warn!("[{}] protocol error: {}", self.session_id, error);
    }

    /// Run the unit's shutdown hook and release every subscription
    pub fn stop(&mut self) {
        self.strategy.on_shutdown();
        self.inbox.close();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.ready = false;
        log::info!("[{}] stopped: {:?}", self.session_id, self.summary);
    }
}

impl Drop for StrategyHost {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
