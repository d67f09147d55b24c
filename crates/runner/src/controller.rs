//! Backtest Bridge Controller - drives one session bar by bar
//!
//! ```text
//!  Idle ──launch──► AwaitingReadiness ──ready──► Streaming ──end──► Draining ──► Shutdown
//!    └────────────────────┴──────── fatal ──────────┴───────────────────────────────┘
//! ```
//!
//! Per bar: advance the replay clock, publish the bar, wait up to the bar
//! budget for the session's signal, execute it, push the position back.

use relay_bus::{
    Broker, BusClient, BusError, ChannelMessage, ChannelPolicy, Channels, Inbox, PositionUpdate,
    ReadinessRecord,
};
use relay_clock::ReplayClock;
use relay_core::{MarketBar, SessionId, Signal};
use relay_host::{SessionHandle, StrategyHost, spawn_session};
use relay_ports::{DataError, MarketDataSource, PortfolioLedger};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{ConfigError, ControllerConfig};
use crate::error::{ControllerError, Result};
use crate::report::BacktestReport;
use crate::state::ControllerState;

/// How an incoming signal relates to the bar being replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timing {
    Current,
    Late,
}

pub struct BacktestController {
    /// Timings and replay window
    config: ControllerConfig,
    session_id: SessionId,
    /// Global-namespace client
    client: BusClient,
    /// Read-only bar source shared with the bootstrap service
    dataset: Arc<dyn MarketDataSource>,
    /// Replay position, read by the bootstrap service
    clock: ReplayClock,
    /// Authoritative portfolio, owned here only
    ledger: Box<dyn PortfolioLedger>,
    state: ControllerState,
    /// Readiness records and this session's signals
    inbox: Inbox,
    /// Idempotency keys already accepted
    seen: HashSet<String>,
    last_bar: Option<(usize, MarketBar)>,
    report: BacktestReport,
}

impl BacktestController {
    pub fn new(
        config: ControllerConfig,
        session_id: SessionId,
        global: Arc<dyn Broker>,
        dataset: Arc<dyn MarketDataSource>,
        clock: ReplayClock,
        ledger: Box<dyn PortfolioLedger>,
    ) -> Self {
        let client = BusClient::new(
            format!("controller:{}", session_id),
            global,
            ChannelPolicy::global(),
            session_id.clone(),
        )
        .with_backoff(config.backoff);

        Self {
            inbox: Inbox::new(format!("controller:{}", session_id), config.inbox_capacity),
            report: BacktestReport::new(session_id.clone()),
            config,
            session_id,
            client,
            dataset,
            clock,
            ledger,
            state: ControllerState::Idle,
            seen: HashSet::new(),
            last_bar: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Run the session to completion
    ///
    /// Fatal errors end in `Shutdown` with the error recorded on the report;
    /// the session is still stopped.
    pub async fn run(mut self, host: StrategyHost) -> BacktestReport {
        let mut session = None;

        if let Err(e) = self.execute(host, &mut session).await {
            log::error!("[{}] fatal in {}: {}", self.session_id, self.state, e);
            let mut error = e.to_string();

            if let Some(handle) = session.take() {
                match handle.stop_within(self.config.drain_timeout).await {
                    Ok(summary) => self.report.session = Some(summary),
                    Err(cause) => error = format!("{} ({})", error, cause),
                }
            }
            self.report.error = Some(error);
            self.force_shutdown();
        }

        self.inbox.close();
        self.report.status = self.state;
        self.report.final_positions = self.ledger.positions();
        self.report.realized_pnl = self.ledger.realized_pnl();
        log::info!(
            "[{}] {}: {} bars, {} signals executed",
            self.session_id,
            self.state,
            self.report.bars_published,
            self.report.signals_executed
        );
        self.report
    }

    async fn execute(&mut self, host: StrategyHost, session: &mut Option<SessionHandle>) -> Result<()> {
        if host.session_id() != &self.session_id {
            return Err(ConfigError::Invalid(format!(
                "host session {} does not match controller session {}",
                host.session_id(),
                self.session_id
            ))
            .into());
        }

        let symbol = self.config.symbol.clone();
        let Some(len) = self.dataset.len(&symbol) else {
            log::error!(
                "[{}] {} not in dataset (have {:?})",
                self.session_id,
                symbol,
                self.dataset.symbols()
            );
            return Err(DataError::SymbolNotFound(symbol).into());
        };
        let end = self.config.end_index.unwrap_or(len).min(len);
        let start = self.config.start_index.min(end);

        // Subscriptions first, so readiness cannot be missed
        self.client.connect().await?;
        self.inbox.attach(self.client.subscribe(Channels::STRATEGY_READY).await?);
        self.inbox
            .attach(self.client.subscribe(&Channels::signal(&self.session_id)).await?);

        // Bootstrap windows end just before the first streamed bar
        let parked_at = start
            .checked_sub(1)
            .and_then(|i| self.dataset.bar_at(&symbol, i))
            .map(|bar| bar.timestamp)
            .unwrap_or_else(chrono::Utc::now);
        self.clock.advance(start, parked_at);

        self.transition(ControllerState::AwaitingReadiness)?;
        *session = Some(spawn_session(host));
        self.await_readiness().await?;

        self.transition(ControllerState::Streaming)?;
        log::info!("[{}] streaming {} bars [{}, {})", self.session_id, symbol, start, end);
        for index in start..end {
            self.step(&symbol, index).await?;
        }

        self.transition(ControllerState::Draining)?;
        self.drain().await?;

        if let Some(handle) = session.take() {
            self.report.session = Some(handle.stop_within(self.config.drain_timeout).await?);
        }
        self.transition(ControllerState::Shutdown)
    }

    async fn await_readiness(&mut self) -> Result<()> {
        let timeout = self.config.readiness_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match self.inbox.recv_timeout(remaining).await {
                Ok(msg) => msg,
                Err(BusError::Timeout) => {
                    return Err(ControllerError::ReadinessTimeout {
                        session_id: self.session_id.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            if msg.channel != Channels::STRATEGY_READY {
                self.report.signals_received += 1;
                self.report.rejected_signals += 1;
                log::warn!("[{}] signal before readiness rejected", self.session_id);
                continue;
            }

            match msg.decode::<ReadinessRecord>() {
                Ok(record) if record.ready && record.session_id == self.session_id => {
                    log::info!(
                        "[{}] {} ready (pid {})",
                        self.session_id,
                        record.strategy_name,
                        record.pid
                    );
                    return Ok(());
                }
                Ok(record) => log::debug!("[{}] ignoring readiness of {}", self.session_id, record.session_id),
                Err(e) => log::warn!("[{}] {}", self.session_id, e),
            }
        }
    }

    async fn step(&mut self, symbol: &str, index: usize) -> Result<()> {
        let bar = self
            .dataset
            .bar_at(symbol, index)
            .ok_or_else(|| DataError::InvalidRange {
                symbol: symbol.to_string(),
                start: index,
                end: index + 1,
            })?;

        self.clock.advance(index, bar.timestamp);
        self.publish(&Channels::market_data(&self.session_id), &bar).await?;
        self.report.bars_published += 1;

        let filled = self.collect_signals(&bar, self.config.bar_budget, true).await?;
        self.ledger.mark_to_market(&bar);
        self.push_position(index, &bar, filled).await?;
        self.last_bar = Some((index, bar));
        Ok(())
    }

    /// Late signals still arriving after the last bar are executed against it
    async fn drain(&mut self) -> Result<()> {
        let Some((index, bar)) = self.last_bar.clone() else {
            return Ok(());
        };

        let filled = self.collect_signals(&bar, self.config.drain_timeout, false).await?;
        if filled {
            self.push_position(index, &bar, true).await?;
        }
        Ok(())
    }

    /// Process signals until `budget` runs out; true if anything filled
    ///
    /// With `until_current`, returns as soon as the signal for `bar` is handled.
    async fn collect_signals(&mut self, bar: &MarketBar, budget: Duration, until_current: bool) -> Result<bool> {
        let deadline = Instant::now() + budget;
        let mut filled = false;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match self.inbox.recv_timeout(remaining).await {
                Ok(msg) => msg,
                Err(BusError::Timeout) => return Ok(filled),
                Err(e) => return Err(e.into()),
            };
            if msg.channel == Channels::STRATEGY_READY {
                continue;
            }

            let Some((signal, timing)) = self.accept(&msg, bar) else {
                continue;
            };
            filled |= self.execute_signal(&signal, bar);

            if until_current && timing == Timing::Current {
                return Ok(filled);
            }
        }
    }

    /// Screen one signal message; `None` means it was dropped
    fn accept(&mut self, msg: &ChannelMessage, bar: &MarketBar) -> Option<(Signal, Timing)> {
        self.report.signals_received += 1;

        let signal: Signal = match msg.decode() {
            Ok(signal) => signal,
            Err(e) => {
                self.report.rejected_signals += 1;
                log::warn!("[{}] {}", self.session_id, e);
                return None;
            }
        };
        if signal.session_id != self.session_id {
            self.report.rejected_signals += 1;
            log::warn!(
                "[{}] signal from foreign session {} rejected",
                self.session_id,
                signal.session_id
            );
            return None;
        }
        if signal.timestamp > bar.timestamp {
            self.report.rejected_signals += 1;
            log::warn!(
                "[{}] signal for {} is ahead of bar {}",
                self.session_id,
                signal.timestamp,
                bar.timestamp
            );
            return None;
        }

        let key = signal.idempotency_key();
        if !self.seen.insert(key.clone()) {
            self.report.duplicate_signals += 1;
            log::warn!("[{}] duplicate signal {} dropped", self.session_id, key);
            return None;
        }

        if signal.timestamp < bar.timestamp {
            self.report.late_signals += 1;
            log::warn!(
                "[{}] late signal for {} executed at bar {}",
                self.session_id,
                signal.timestamp,
                bar.timestamp
            );
            return Some((signal, Timing::Late));
        }
        Some((signal, Timing::Current))
    }

    fn execute_signal(&mut self, signal: &Signal, bar: &MarketBar) -> bool {
        match self.ledger.execute(signal, bar) {
            Ok(fill) => {
                self.report.signals_executed += 1;
                self.report.fills.push(fill);
                true
            }
            Err(e) => {
                self.report.rejected_signals += 1;
                log::warn!("[{}] {} not executed: {}", self.session_id, signal.action, e);
                false
            }
        }
    }

    /// Push the authoritative snapshot after a fill, or while a position is open
    async fn push_position(&mut self, index: usize, bar: &MarketBar, filled: bool) -> Result<()> {
        let snapshot = self.ledger.snapshot(&bar.symbol);
        if !filled && snapshot.is_flat() {
            return Ok(());
        }
        let update = PositionUpdate {
            bar_index: index,
            snapshot,
        };
        self.publish(&Channels::position_update(&self.session_id), &update).await
    }

    /// Publish, reconnecting once the bus reports a lost connection
    async fn publish<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        match self.client.publish_typed(channel, payload, None).await {
            Err(e) if e.is_connection() => {
                log::warn!("[{}] publish on {} failed: {}", self.session_id, channel, e);
                self.client.reconnect().await?;
                self.client.publish_typed(channel, payload, None).await?;
                Ok(())
            }
            result => result.map_err(Into::into),
        }
    }

    fn transition(&mut self, next: ControllerState) -> Result<()> {
        self.state = self.state.transition(next)?;
        log::debug!("[{}] -> {}", self.session_id, self.state);
        Ok(())
    }

    fn force_shutdown(&mut self) {
        if !self.state.is_terminal() {
            self.state = ControllerState::Shutdown;
        }
    }
}
