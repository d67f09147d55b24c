//! Capability Proxy
//!
//! The only component that touches both namespaces. It forwards a session's
//! outbound traffic (signals, bootstrap requests) to the global bus, delivers
//! inbound traffic (bars, position pushes, bootstrap responses) to the local
//! bus, and keeps a mirror of the controller's position snapshots for the
//! strategy to read. State only flows controller -> proxy.

use relay_bus::{
    BusClient, BusError, ChannelMessage, ChannelRoutes, Channels, HistoricalDataRequest,
    HistoricalDataResponse, Inbox, Namespace, PositionUpdate, ProtocolError,
};
use relay_core::{PositionSnapshot, SessionId, Signal};
use relay_strategy::{NativeSignal, RiskCheck, TradingBot};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// Global -> local
    Inbound,
    /// Local -> global
    Outbound,
}

/// Idempotency key of a signal, else its correlation id
fn message_key(msg: &ChannelMessage) -> String {
    msg.decode::<Signal>()
        .map(|signal| signal.idempotency_key())
        .ok()
        .or_else(|| msg.correlation_id.clone())
        .unwrap_or_else(|| "no key".to_string())
}

#[derive(Debug, Default)]
struct Mirror {
    positions: HashMap<String, PositionSnapshot>,
    /// Newest bar index applied
    bar_index: Option<usize>,
}

pub struct CapabilityProxy {
    session_id: SessionId,
    routes: ChannelRoutes,
    local: BusClient,
    global: BusClient,
    mirror: RwLock<Mirror>,
    pending: Mutex<HashSet<String>>,
    quiet: AtomicBool,
    healthy: AtomicBool,
}

impl CapabilityProxy {
    /// `local` must carry a local policy, `global` this session's policy
    pub fn new(session_id: SessionId, local: BusClient, global: BusClient) -> Self {
        Self {
            routes: ChannelRoutes::new(session_id.clone()),
            session_id,
            local,
            global,
            mirror: RwLock::new(Mirror::default()),
            pending: Mutex::new(HashSet::new()),
            quiet: AtomicBool::new(false),
            healthy: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub async fn connect(&self) -> Result<(), BusError> {
        self.local.connect().await?;
        self.global.connect().await?;
        self.healthy.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Open every subscription, then pump both directions on a task
    ///
    /// Subscriptions exist when this returns, so nothing published afterwards
    /// is missed.
    pub async fn start(self: &Arc<Self>, capacity: usize) -> Result<JoinHandle<()>, BusError> {
        let mut inbound = Inbox::new(format!("{}:inbound", self.session_id), capacity);
        for channel in self.routes.inbound() {
            inbound.attach(self.global.subscribe(&channel).await?);
        }
        let mut outbound = Inbox::new(format!("{}:outbound", self.session_id), capacity);
        for channel in self.routes.outbound() {
            outbound.attach(self.local.subscribe(channel).await?);
        }

        let proxy = Arc::clone(self);
        Ok(tokio::spawn(async move {
            proxy.pump(inbound, outbound).await;
        }))
    }

    async fn pump(&self, mut inbound: Inbox, mut outbound: Inbox) {
        loop {
            let (direction, msg) = tokio::select! {
                msg = inbound.recv() => match msg {
                    Ok(msg) => (Direction::Inbound, msg),
                    Err(_) => break,
                },
                msg = outbound.recv() => match msg {
                    Ok(msg) => (Direction::Outbound, msg),
                    Err(_) => break,
                },
            };

            if !self.deliver(direction, msg).await {
                break;
            }
        }
        self.healthy.store(false, Ordering::SeqCst);
        log::info!("[{}] proxy stopped", self.session_id);
    }

    /// Forward one message, resending it once after a successful reconnect
    ///
    /// Returns false when the proxy cannot continue.
    async fn deliver(&self, direction: Direction, msg: ChannelMessage) -> bool {
        let error = match self.forward(direction, msg.clone()).await {
            Ok(()) => return true,
            Err(e) => e,
        };
        if !error.is_connection() {
            log::warn!("[{}] dropped message on {}: {}", self.session_id, msg.channel, error);
            return true;
        }

        let client = match direction {
            Direction::Inbound => &self.local,
            Direction::Outbound => &self.global,
        };
        self.healthy.store(false, Ordering::SeqCst);
        if let Err(e) = client.reconnect().await {
            log::error!(
                "[{}] proxy giving up: {}; lost {} ({})",
                self.session_id,
                e,
                msg.channel,
                message_key(&msg)
            );
            return false;
        }
        self.healthy.store(true, Ordering::SeqCst);

        if let Err(e) = self.forward(direction, msg.clone()).await {
            log::warn!(
                "[{}] {} lost after reconnect ({}): {}",
                self.session_id,
                msg.channel,
                message_key(&msg),
                e
            );
        }
        true
    }

    async fn forward(&self, direction: Direction, msg: ChannelMessage) -> Result<(), BusError> {
        match direction {
            Direction::Inbound => self.forward_global(msg).await.map(|_| ()),
            Direction::Outbound => self.forward_local(msg).await,
        }
    }

    /// Local -> global
    ///
    /// Bootstrap requests are remembered by correlation id so only their
    /// responses come back in.
    pub async fn forward_local(&self, msg: ChannelMessage) -> Result<(), BusError> {
        if Namespace::of(&msg.channel) != Some(Namespace::Local) {
            return Err(BusError::NamespaceViolation {
                channel: msg.channel,
            });
        }
        let target = self
            .routes
            .to_global(&msg.channel)
            .ok_or_else(|| ProtocolError::UnknownChannel(msg.channel.clone()))?;

        let mut out = msg.rerouted(target);
        out.session_id = self.session_id.clone();

        if msg.channel == Channels::LOCAL_HISTORY_REQUEST {
            let request_id = match msg.correlation_id.clone() {
                Some(id) => id,
                None => msg.decode::<HistoricalDataRequest>()?.request_id,
            };
            out.correlation_id = Some(request_id.clone());
            self.lock_pending().insert(request_id);
        }

        log::debug!("[{}] {} -> {}", self.session_id, msg.channel, out.channel);
        self.global.forward(out).await
    }

    /// Global -> local; returns whether the message was delivered
    ///
    /// Position updates are applied to the mirror first; stale ones stop here.
    /// Bootstrap responses for requests this session never sent are dropped.
    pub async fn forward_global(&self, msg: ChannelMessage) -> Result<bool, BusError> {
        if Namespace::of(&msg.channel) != Some(Namespace::Global) {
            return Err(BusError::NamespaceViolation {
                channel: msg.channel,
            });
        }
        let target = self
            .routes
            .to_local(&msg.channel)
            .ok_or_else(|| ProtocolError::UnknownChannel(msg.channel.clone()))?;

        match target {
            Channels::LOCAL_POSITION_UPDATE => {
                let update: PositionUpdate = msg.decode()?;
                if !self.apply_position(&update) {
                    return Ok(false);
                }
            }
            Channels::LOCAL_HISTORY_RESPONSE => {
                let request_id = match msg.correlation_id.clone() {
                    Some(id) => id,
                    None => msg.decode::<HistoricalDataResponse>()?.request_id,
                };
                if !self.lock_pending().remove(&request_id) {
                    log::debug!("[{}] ignoring response {}", self.session_id, request_id);
                    return Ok(false);
                }
            }
            _ => {}
        }

        self.local.forward(msg.rerouted(target)).await?;
        Ok(true)
    }

    /// Apply a pushed snapshot; false if older than what the mirror holds
    pub fn apply_position(&self, update: &PositionUpdate) -> bool {
        let mut mirror = match self.mirror.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(newest) = mirror.bar_index
            && update.bar_index < newest
        {
            log::warn!(
                "[{}] stale position update for bar {} (have {})",
                self.session_id,
                update.bar_index,
                newest
            );
            return false;
        }
        mirror.bar_index = Some(update.bar_index);
        mirror
            .positions
            .insert(update.snapshot.symbol.clone(), update.snapshot.clone());
        true
    }

    /// Bar index of the newest applied snapshot
    pub fn mirror_index(&self) -> Option<usize> {
        self.read_mirror(|m| m.bar_index)
    }

    /// Bootstrap requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.lock_pending().len()
    }

    fn read_mirror<T>(&self, f: impl FnOnce(&Mirror) -> T) -> T {
        match self.mirror.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TradingBot for CapabilityProxy {
    fn position(&self, symbol: &str) -> Option<PositionSnapshot> {
        self.read_mirror(|m| m.positions.get(symbol).cloned())
    }

    fn positions(&self) -> Vec<PositionSnapshot> {
        self.read_mirror(|m| m.positions.values().cloned().collect())
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst) && self.global.is_connected()
    }

    fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::Relaxed)
    }

    fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::Relaxed);
    }

    /// Backtests run without pre-trade risk; every payload passes
    fn check_risk(&self, _signal: &NativeSignal) -> RiskCheck {
        RiskCheck::passed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_bus::{Broker, ChannelPolicy, InMemoryBroker};
    use relay_core::{PositionSide, SignalAction};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        proxy: Arc<CapabilityProxy>,
        local: Arc<InMemoryBroker>,
        global: Arc<InMemoryBroker>,
        sid: SessionId,
    }

    async fn fixture() -> Fixture {
        let sid = SessionId::from("s-1");
        let local = Arc::new(InMemoryBroker::new());
        let global = Arc::new(InMemoryBroker::new());
        let proxy = Arc::new(CapabilityProxy::new(
            sid.clone(),
            BusClient::new("local", local.clone(), ChannelPolicy::local(), sid.clone()),
            BusClient::new("global", global.clone(), ChannelPolicy::session(&sid), sid.clone()),
        ));
        proxy.connect().await.unwrap();
        Fixture {
            proxy,
            local,
            global,
            sid,
        }
    }

    fn update(index: usize, qty: rust_decimal::Decimal) -> PositionUpdate {
        let mut snapshot = PositionSnapshot::flat("MCL", dec!(61.94), Utc::now());
        if !qty.is_zero() {
            snapshot.side = PositionSide::Long;
            snapshot.quantity = qty;
        }
        PositionUpdate {
            bar_index: index,
            snapshot,
        }
    }

    #[tokio::test]
    async fn test_forward_local_rejects_global_channel() {
        let f = fixture().await;
        let msg = ChannelMessage::new(Channels::STRATEGY_READY, json!({}), f.sid.clone());

        let result = f.proxy.forward_local(msg).await;
        assert_eq!(
            result,
            Err(BusError::NamespaceViolation {
                channel: Channels::STRATEGY_READY.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_forward_global_rejects_local_channel() {
        let f = fixture().await;
        let msg = ChannelMessage::new(Channels::LOCAL_MARKET_DATA, json!({}), f.sid.clone());
        assert!(matches!(
            f.proxy.forward_global(msg).await,
            Err(BusError::NamespaceViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_signal_goes_to_session_channel() {
        let f = fixture().await;
        let mut sub = f.global.subscribe(&Channels::signal(&f.sid)).await.unwrap();

        let msg = ChannelMessage::new(Channels::LOCAL_SIGNAL, json!({"action": "BUY"}), "other".into());
        f.proxy.forward_local(msg).await.unwrap();

        let out = sub.next().await.unwrap();
        assert_eq!(out.session_id, f.sid);
        assert_eq!(out.payload, json!({"action": "BUY"}));
    }

    #[tokio::test]
    async fn test_only_own_bootstrap_responses_come_in() {
        let f = fixture().await;
        let mut local = f.local.subscribe(Channels::LOCAL_HISTORY_RESPONSE).await.unwrap();

        let request = HistoricalDataRequest::new("mine", "MCL", 10);
        let msg = ChannelMessage::encode(Channels::LOCAL_HISTORY_REQUEST, &request, f.sid.clone()).unwrap();
        f.proxy.forward_local(msg).await.unwrap();
        assert_eq!(f.proxy.pending_requests(), 1);

        let foreign = ChannelMessage::encode(
            Channels::HISTORY_RESPONSE,
            &HistoricalDataResponse::ok("theirs", &[]),
            "other".into(),
        )
        .unwrap()
        .with_correlation("theirs");
        assert!(!f.proxy.forward_global(foreign).await.unwrap());

        let ours = ChannelMessage::encode(
            Channels::HISTORY_RESPONSE,
            &HistoricalDataResponse::ok("mine", &[]),
            f.sid.clone(),
        )
        .unwrap()
        .with_correlation("mine");
        assert!(f.proxy.forward_global(ours).await.unwrap());

        let delivered = local.next().await.unwrap();
        assert_eq!(delivered.correlation_id.as_deref(), Some("mine"));
        assert_eq!(f.proxy.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_mirror_ignores_stale_updates() {
        let f = fixture().await;

        assert!(f.proxy.apply_position(&update(5, dec!(1))));
        assert!(!f.proxy.apply_position(&update(3, dec!(0))));

        let held = f.proxy.position("MCL").unwrap();
        assert_eq!(held.quantity, dec!(1));
        assert_eq!(f.proxy.mirror_index(), Some(5));
    }

    #[tokio::test]
    async fn test_position_update_forwarded_after_mirroring() {
        let f = fixture().await;
        let mut local = f.local.subscribe(Channels::LOCAL_POSITION_UPDATE).await.unwrap();

        let msg = ChannelMessage::encode(Channels::position_update(&f.sid), &update(1, dec!(2)), f.sid.clone())
            .unwrap();
        assert!(f.proxy.forward_global(msg).await.unwrap());

        assert_eq!(f.proxy.positions().len(), 1);
        let delivered: PositionUpdate = local.next().await.unwrap().decode().unwrap();
        assert_eq!(delivered.snapshot.quantity, dec!(2));
    }

    #[tokio::test]
    async fn test_capabilities() {
        let f = fixture().await;
        assert!(f.proxy.is_healthy());
        assert!(!f.proxy.is_quiet());
        f.proxy.set_quiet(true);
        assert!(f.proxy.is_quiet());
        assert!(f.proxy.check_risk(&NativeSignal::new().with("action", "BUY")).passed);
        assert!(f.proxy.position("MCL").is_none());
    }

    fn buy(sid: &SessionId) -> Signal {
        Signal::new(SignalAction::Buy, dec!(61.94), dec!(1), sid.clone(), Utc::now())
    }

    async fn host_client(f: &Fixture) -> BusClient {
        let client = BusClient::new("host", f.local.clone(), ChannelPolicy::local(), f.sid.clone());
        client.connect().await.unwrap();
        client
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_survives_short_global_outage() {
        let f = fixture().await;
        let _pump = f.proxy.start(16).await.unwrap();
        let mut signals = f.global.subscribe(&Channels::signal(&f.sid)).await.unwrap();
        let host = host_client(&f).await;

        f.global.set_online(false);
        let signal = buy(&f.sid);
        host.publish_typed(Channels::LOCAL_SIGNAL, &signal, Some(signal.idempotency_key()))
            .await
            .unwrap();

        let global = f.global.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            global.set_online(true);
        });

        let msg = tokio::time::timeout(Duration::from_secs(5), signals.next())
            .await
            .expect("signal never reached the global bus")
            .unwrap();
        let delivered: Signal = msg.decode().unwrap();
        assert_eq!(delivered.idempotency_key(), signal.idempotency_key());
        assert!(f.proxy.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_stops_when_reconnect_is_exhausted() {
        let f = fixture().await;
        let pump = f.proxy.start(16).await.unwrap();
        let host = host_client(&f).await;

        f.global.set_online(false);
        let signal = buy(&f.sid);
        host.publish_typed(Channels::LOCAL_SIGNAL, &signal, None).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), pump)
            .await
            .expect("pump kept running")
            .unwrap();
        assert!(!f.proxy.is_healthy());
    }
}
