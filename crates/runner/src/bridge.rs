use chrono::Utc;
use relay_bus::{Broker, BusClient, ChannelPolicy, InMemoryBroker};
use relay_clock::ReplayClock;
use relay_core::SessionId;
use relay_history::HistoricalBootstrapService;
use relay_host::StrategyHost;
use relay_ledger::PaperLedger;
use relay_ports::MarketDataSource;
use relay_strategy::StrategyRegistry;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::BridgeConfig;
use crate::controller::BacktestController;
use crate::error::Result;
use crate::report::BacktestReport;

/// Wire one complete backtest on an in-process bus and run it
///
/// Bootstrap service, strategy session and controller share the global
/// broker; the session gets its own local broker inside the host.
pub async fn run_backtest(
    config: &BridgeConfig,
    dataset: Arc<dyn MarketDataSource>,
    registry: &StrategyRegistry,
) -> Result<BacktestReport> {
    let global: Arc<dyn Broker> = Arc::new(InMemoryBroker::with_capacity(config.bus.inbox_capacity));
    let clock = ReplayClock::new(Utc::now());
    let session_id = SessionId::new();

    let history_client = BusClient::new(
        "history",
        global.clone(),
        ChannelPolicy::global(),
        SessionId::from("history"),
    )
    .with_backoff(config.backoff());
    history_client.connect().await?;

    let (shutdown, shutdown_rx) = broadcast::channel(1);
    let service = HistoricalBootstrapService::new(dataset.clone(), clock.clone());
    let stats = service.stats();
    let history = service.start(history_client, shutdown_rx).await?;

    let host = StrategyHost::load(
        registry,
        config.strategy.clone(),
        config.host_config(),
        session_id.clone(),
        global.clone(),
    )?;
    let controller = BacktestController::new(
        config.controller_config(),
        session_id,
        global,
        dataset,
        clock,
        Box::new(PaperLedger::new(config.ledger.fee_rate)),
    );

    let report = controller.run(host).await;

    let _ = shutdown.send(());
    match history.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("[Bridge] bootstrap service stopped with error: {}", e),
        Err(e) => log::warn!("[Bridge] bootstrap service task failed: {}", e),
    }
    log::info!("[Bridge] bootstrap service: {:?}", stats.snapshot());
    Ok(report)
}
