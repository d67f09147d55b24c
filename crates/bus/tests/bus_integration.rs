//! Bus integration tests: typed round-trips, namespace isolation, reconnect budget

use chrono::{TimeZone, Utc};
use relay_bus::{
    BackoffPolicy, BusClient, BusError, ChannelPolicy, Channels, InMemoryBroker, Inbox,
    PositionUpdate,
};
use relay_core::{MarketBar, PositionSnapshot, SessionId};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

fn bar(minute: u32) -> MarketBar {
    MarketBar::new(
        "MCL",
        Utc.with_ymd_and_hms(2024, 3, 1, 14, minute, 0).unwrap(),
        dec!(61.90),
        dec!(62.05),
        dec!(61.80),
        dec!(61.94),
        dec!(1250),
    )
}

#[tokio::test]
async fn test_market_bar_round_trip_is_payload_identical() {
    let broker = Arc::new(InMemoryBroker::new());
    let sid = SessionId::from("s-1");
    let controller = BusClient::new("controller", broker.clone(), ChannelPolicy::global(), sid.clone());
    let proxy = BusClient::new("proxy", broker, ChannelPolicy::session(&sid), sid.clone());
    controller.connect().await.unwrap();
    proxy.connect().await.unwrap();

    let mut sub = proxy.subscribe(&Channels::market_data(&sid)).await.unwrap();
    let sent: Vec<MarketBar> = (0..5).map(bar).collect();
    for b in &sent {
        controller
            .publish_typed(&Channels::market_data(&sid), b, None)
            .await
            .unwrap();
    }

    for expected in &sent {
        let msg = sub.next().await.unwrap();
        assert_eq!(msg.payload, serde_json::to_value(expected).unwrap());
        assert_eq!(&msg.decode::<MarketBar>().unwrap(), expected);
    }
}

#[tokio::test]
async fn test_session_policy_blocks_other_sessions() {
    let broker = Arc::new(InMemoryBroker::new());
    let mine = SessionId::from("mine");
    let other = SessionId::from("other");
    let proxy = BusClient::new("proxy", broker, ChannelPolicy::session(&mine), mine);
    proxy.connect().await.unwrap();

    let result = proxy.subscribe(&Channels::market_data(&other)).await;
    assert!(matches!(result, Err(BusError::NamespaceViolation { .. })));

    let result = proxy
        .publish(Channels::STRATEGY_READY, serde_json::json!({}), None)
        .await;
    assert!(matches!(result, Err(BusError::NamespaceViolation { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_exhausts_backoff() {
    let broker = Arc::new(InMemoryBroker::new());
    let client = BusClient::new("controller", broker.clone(), ChannelPolicy::global(), "s".into())
        .with_backoff(BackoffPolicy::default());
    client.connect().await.unwrap();

    broker.set_online(false);
    let err = client
        .publish_typed(Channels::STRATEGY_READY, &bar(0), None)
        .await
        .unwrap_err();
    assert_eq!(err, BusError::NotConnected);

    let start = tokio::time::Instant::now();
    let err = client.reconnect().await.unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err, BusError::ConnectionLost { attempts: 3 });
    // 50 + 100 + 200
    assert!(elapsed >= Duration::from_millis(350));
    assert!(elapsed < Duration::from_millis(400));
}

#[tokio::test]
async fn test_inbox_receives_position_updates_in_order() {
    let broker = Arc::new(InMemoryBroker::new());
    let sid = SessionId::from("s-2");
    let controller = BusClient::new("controller", broker.clone(), ChannelPolicy::global(), sid.clone());
    controller.connect().await.unwrap();

    let mut inbox = Inbox::new("proxy", 8);
    inbox.attach(controller.subscribe(&Channels::position_update(&sid)).await.unwrap());

    for index in 0..3 {
        let update = PositionUpdate {
            bar_index: index,
            snapshot: PositionSnapshot::flat("MCL", dec!(61.94), Utc::now()),
        };
        controller
            .publish_typed(&Channels::position_update(&sid), &update, None)
            .await
            .unwrap();
    }

    for index in 0..3 {
        let update: PositionUpdate = inbox.recv().await.unwrap().decode().unwrap();
        assert_eq!(update.bar_index, index);
    }
}
