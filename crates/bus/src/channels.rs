//! Channel names, namespaces and per-client policies

use relay_core::SessionId;

use crate::error::{BusError, Result};

/// Which side of the Proxy a channel lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Private to one strategy session
    Local,
    /// Visible to the controller and shared services
    Global,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Local => Channels::LOCAL_PREFIX,
            Namespace::Global => Channels::GLOBAL_PREFIX,
        }
    }

    /// Namespace a channel name belongs to, if any
    pub fn of(channel: &str) -> Option<Namespace> {
        if channel.starts_with(Channels::LOCAL_PREFIX) {
            Some(Namespace::Local)
        } else if channel.starts_with(Channels::GLOBAL_PREFIX) {
            Some(Namespace::Global)
        } else {
            None
        }
    }
}

/// Canonical channel names
///
/// Session-scoped global channels carry the session id as a suffix so a
/// controller can run several sessions over one broker.
pub struct Channels;

impl Channels {
    pub const LOCAL_PREFIX: &'static str = "strategy:";
    pub const GLOBAL_PREFIX: &'static str = "backtest:";

    // Local (inside a session)

    pub const LOCAL_MARKET_DATA: &'static str = "strategy:market-data";
    pub const LOCAL_HISTORY_REQUEST: &'static str = "strategy:historical-data:request";
    pub const LOCAL_HISTORY_RESPONSE: &'static str = "strategy:historical-data:response";
    pub const LOCAL_POSITION_UPDATE: &'static str = "strategy:position:update";
    pub const LOCAL_SIGNAL: &'static str = "strategy:signal";

    // Global (controller and shared services)

    pub const HISTORY_REQUEST: &'static str = "backtest:historical-data:request";
    pub const HISTORY_RESPONSE: &'static str = "backtest:historical-data:response";
    pub const STRATEGY_READY: &'static str = "backtest:strategy-ready";

    /// Bars for one session: `backtest:market-data:<id>`
    pub fn market_data(session_id: &SessionId) -> String {
        format!("backtest:market-data:{}", session_id)
    }

    /// Signals from one session: `backtest:signal:<id>`
    pub fn signal(session_id: &SessionId) -> String {
        format!("backtest:signal:{}", session_id)
    }

    /// Position pushes for one session: `backtest:position:update:<id>`
    pub fn position_update(session_id: &SessionId) -> String {
        format!("backtest:position:update:{}", session_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    Prefix(String),
    Exact(String),
}

impl Rule {
    fn allows(&self, channel: &str) -> bool {
        match self {
            Rule::Prefix(prefix) => channel.starts_with(prefix.as_str()),
            Rule::Exact(name) => channel == name,
        }
    }
}

/// The channels one client may touch
///
/// Passed into each client at construction; checked before every publish and
/// subscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPolicy {
    rules: Vec<Rule>,
}

impl ChannelPolicy {
    /// Everything under `strategy:`
    pub fn local() -> Self {
        Self {
            rules: vec![Rule::Prefix(Channels::LOCAL_PREFIX.to_string())],
        }
    }

    /// Everything under `backtest:`
    pub fn global() -> Self {
        Self {
            rules: vec![Rule::Prefix(Channels::GLOBAL_PREFIX.to_string())],
        }
    }

    /// Exactly one channel
    pub fn only(channel: impl Into<String>) -> Self {
        Self {
            rules: vec![Rule::Exact(channel.into())],
        }
    }

    /// Global channels a single session's Proxy may use
    ///
    /// Its own session-scoped channels plus the shared bootstrap pair.
    pub fn session(session_id: &SessionId) -> Self {
        Self {
            rules: vec![
                Rule::Exact(Channels::market_data(session_id)),
                Rule::Exact(Channels::signal(session_id)),
                Rule::Exact(Channels::position_update(session_id)),
                Rule::Exact(Channels::HISTORY_REQUEST.to_string()),
                Rule::Exact(Channels::HISTORY_RESPONSE.to_string()),
            ],
        }
    }

    pub fn allows(&self, channel: &str) -> bool {
        self.rules.iter().any(|rule| rule.allows(channel))
    }

    /// `NamespaceViolation` unless `channel` is allowed
    pub fn check(&self, channel: &str) -> Result<()> {
        if self.allows(channel) {
            Ok(())
        } else {
            Err(BusError::NamespaceViolation {
                channel: channel.to_string(),
            })
        }
    }
}

/// Local ↔ global channel mapping for one session
#[derive(Debug, Clone)]
pub struct ChannelRoutes {
    session_id: SessionId,
}

impl ChannelRoutes {
    pub fn new(session_id: SessionId) -> Self {
        Self { session_id }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Global channel a local message is forwarded to (outbound)
    pub fn to_global(&self, local: &str) -> Option<String> {
        match local {
            Channels::LOCAL_SIGNAL => Some(Channels::signal(&self.session_id)),
            Channels::LOCAL_HISTORY_REQUEST => Some(Channels::HISTORY_REQUEST.to_string()),
            _ => None,
        }
    }

    /// Local channel a global message is delivered to (inbound)
    pub fn to_local(&self, global: &str) -> Option<&'static str> {
        if global == Channels::market_data(&self.session_id) {
            Some(Channels::LOCAL_MARKET_DATA)
        } else if global == Channels::position_update(&self.session_id) {
            Some(Channels::LOCAL_POSITION_UPDATE)
        } else if global == Channels::HISTORY_RESPONSE {
            Some(Channels::LOCAL_HISTORY_RESPONSE)
        } else {
            None
        }
    }

    /// Global channels the Proxy listens on
    pub fn inbound(&self) -> Vec<String> {
        vec![
            Channels::market_data(&self.session_id),
            Channels::position_update(&self.session_id),
            Channels::HISTORY_RESPONSE.to_string(),
        ]
    }

    /// Local channels the Proxy listens on
    pub fn outbound(&self) -> Vec<&'static str> {
        vec![Channels::LOCAL_SIGNAL, Channels::LOCAL_HISTORY_REQUEST]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces() {
        assert_eq!(Namespace::of(Channels::LOCAL_SIGNAL), Some(Namespace::Local));
        assert_eq!(Namespace::of(Channels::STRATEGY_READY), Some(Namespace::Global));
        assert_eq!(Namespace::of("md.BTC-USD"), None);
    }

    #[test]
    fn test_policy_rejects_foreign_namespace() {
        let local = ChannelPolicy::local();
        assert!(local.check(Channels::LOCAL_MARKET_DATA).is_ok());
        assert_eq!(
            local.check(Channels::STRATEGY_READY),
            Err(BusError::NamespaceViolation {
                channel: Channels::STRATEGY_READY.to_string()
            })
        );
    }

    #[test]
    fn test_only_policy() {
        let ready = ChannelPolicy::only(Channels::STRATEGY_READY);
        assert!(ready.allows(Channels::STRATEGY_READY));
        assert!(!ready.allows(Channels::HISTORY_REQUEST));
    }

    #[test]
    fn test_session_policy_excludes_other_sessions() {
        let mine = SessionId::from("a");
        let other = SessionId::from("b");
        let policy = ChannelPolicy::session(&mine);

        assert!(policy.allows(&Channels::signal(&mine)));
        assert!(policy.allows(Channels::HISTORY_RESPONSE));
        assert!(!policy.allows(&Channels::signal(&other)));
        assert!(!policy.allows(Channels::STRATEGY_READY));
    }

    #[test]
    fn test_routes() {
        let sid = SessionId::from("s-1");
        let routes = ChannelRoutes::new(sid.clone());

        assert_eq!(
            routes.to_global(Channels::LOCAL_SIGNAL),
            Some("backtest:signal:s-1".to_string())
        );
        assert_eq!(routes.to_global(Channels::LOCAL_MARKET_DATA), None);
        assert_eq!(
            routes.to_local(&Channels::market_data(&sid)),
            Some(Channels::LOCAL_MARKET_DATA)
        );
        assert_eq!(
            routes.to_local(&Channels::market_data(&SessionId::from("s-2"))),
            None
        );
    }
}
