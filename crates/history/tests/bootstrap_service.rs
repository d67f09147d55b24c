//! Integration test: bootstrap service over the bus
//!
//! Requests are published on the global request channel; responses come back
//! on the shared response channel, matched by correlation id.

use chrono::{Duration, TimeZone, Utc};
use relay_bus::{
    BusClient, BusError, ChannelPolicy, Channels, HistoricalDataRequest, HistoricalDataResponse,
    InMemoryBroker, Subscription,
};
use relay_clock::ReplayClock;
use relay_core::{MarketBar, SessionId};
use relay_history::{HistoricalBootstrapService, HistoryError, InMemoryDataset, ServiceStats};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

fn series(symbol: &str, count: i64, base: Decimal) -> Vec<MarketBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let px = base + Decimal::from(i);
            MarketBar::new(symbol, start + Duration::minutes(i), px, px, px, px, dec!(1))
        })
        .collect()
}

async fn collect(sub: &mut Subscription, n: usize) -> HashMap<String, HistoricalDataResponse> {
    let mut out = HashMap::new();
    while out.len() < n {
        let msg = sub.next().await.unwrap();
        let response: HistoricalDataResponse = msg.decode().unwrap();
        assert_eq!(msg.correlation_id.as_deref(), Some(response.request_id.as_str()));
        out.insert(response.request_id.clone(), response);
    }
    out
}

struct Harness {
    broker: Arc<InMemoryBroker>,
    shutdown: broadcast::Sender<()>,
    stats: Arc<ServiceStats>,
    task: JoinHandle<relay_history::Result<()>>,
}

async fn start(index: usize) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut dataset = InMemoryDataset::new();
    dataset.insert("MCL", series("MCL", 1200, dec!(60)));
    dataset.insert("MES", series("MES", 1200, dec!(5000)));

    let clock = ReplayClock::new(Utc::now());
    clock.advance(index, Utc::now());

    let broker = Arc::new(InMemoryBroker::new());
    let client = BusClient::new(
        "history",
        broker.clone(),
        ChannelPolicy::global(),
        SessionId::from("history"),
    );
    client.connect().await.unwrap();

    let (shutdown, rx) = broadcast::channel(1);
    let service = HistoricalBootstrapService::new(Arc::new(dataset), clock);
    let stats = service.stats();
    let task = service.start(client, rx).await.unwrap();

    Harness {
        broker,
        shutdown,
        stats,
        task,
    }
}

async fn requester(broker: &Arc<InMemoryBroker>, session: &str) -> BusClient {
    let sid = SessionId::from(session);
    let client = BusClient::new(session, broker.clone(), ChannelPolicy::session(&sid), sid);
    client.connect().await.unwrap();
    client
}

async fn request(client: &BusClient, id: &str, symbol: &str, bars_back: usize) {
    let request = HistoricalDataRequest::new(id, symbol, bars_back);
    client
        .publish_typed(Channels::HISTORY_REQUEST, &request, Some(id.to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_window_at_index_1000() {
    let harness = start(1000).await;
    let client = requester(&harness.broker, "s-a").await;
    let mut responses = client.subscribe(Channels::HISTORY_RESPONSE).await.unwrap();

    request(&client, "req-a", "MCL", 50).await;
    let response = collect(&mut responses, 1).await.remove("req-a").unwrap();
    let bars = response.into_market_bars("MCL");

    assert_eq!(bars.len(), 50);
    assert_eq!(bars.first().unwrap().close, dec!(1010)); // index 950
    assert_eq!(bars.last().unwrap().close, dec!(1059)); // index 999
    assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let _ = harness.shutdown.send(());
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let harness = start(600).await;
    let a = requester(&harness.broker, "s-a").await;
    let b = requester(&harness.broker, "s-b").await;
    let mut responses = a.subscribe(Channels::HISTORY_RESPONSE).await.unwrap();

    tokio::join!(
        request(&a, "req-mcl", "MCL", 20),
        request(&b, "req-mes", "MES", 30)
    );

    let mut all = collect(&mut responses, 2).await;
    let mcl = all.remove("req-mcl").unwrap().into_market_bars("MCL");
    let mes = all.remove("req-mes").unwrap().into_market_bars("MES");

    assert_eq!(mcl.len(), 20);
    assert_eq!(mes.len(), 30);
    assert!(mcl.iter().all(|b| b.symbol == "MCL" && b.close < dec!(5000)));
    assert!(mes.iter().all(|b| b.symbol == "MES" && b.close >= dec!(5000)));
    assert_eq!(mcl.last().unwrap().close, dec!(659));
    assert_eq!(mes.last().unwrap().close, dec!(5599));

    let _ = harness.shutdown.send(());
}

#[tokio::test]
async fn test_unknown_symbol_gets_failed_response() {
    let harness = start(100).await;
    let client = requester(&harness.broker, "s-a").await;
    let mut responses = client.subscribe(Channels::HISTORY_RESPONSE).await.unwrap();

    request(&client, "req-x", "XYZ", 10).await;
    let response = collect(&mut responses, 1).await.remove("req-x").unwrap();

    assert!(!response.success);
    assert!(response.data.bars.is_empty());
    assert!(response.error.unwrap().contains("XYZ"));

    let _ = harness.shutdown.send(());
}

#[tokio::test(start_paused = true)]
async fn test_reply_resent_after_short_outage() {
    let harness = start(600).await;
    let client = requester(&harness.broker, "s-a").await;
    let mut responses = client.subscribe(Channels::HISTORY_RESPONSE).await.unwrap();

    // The request lands, then the bus drops before the reply goes out
    request(&client, "req-1", "MCL", 10).await;
    harness.broker.set_online(false);
    let broker = harness.broker.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        broker.set_online(true);
    });

    let first = collect(&mut responses, 1).await.remove("req-1").unwrap();
    assert_eq!(first.data.bars.len(), 10);
    assert_eq!(harness.stats.snapshot().send_failures, 1);

    // Still serving after the outage
    request(&client, "req-2", "MES", 5).await;
    let second = collect(&mut responses, 1).await.remove("req-2").unwrap();
    assert_eq!(second.data.bars.len(), 5);
    assert!(!harness.task.is_finished());

    let _ = harness.shutdown.send(());
}

#[tokio::test(start_paused = true)]
async fn test_service_stops_when_reconnect_is_exhausted() {
    let harness = start(600).await;
    let client = requester(&harness.broker, "s-a").await;

    request(&client, "req-1", "MCL", 10).await;
    harness.broker.set_online(false);

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), harness.task)
        .await
        .expect("service kept running")
        .unwrap();
    assert!(matches!(
        result,
        Err(HistoryError::Bus(BusError::ConnectionLost { attempts: 3 }))
    ));
    assert_eq!(harness.stats.snapshot().send_failures, 1);
}
