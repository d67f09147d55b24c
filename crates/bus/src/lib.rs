//! Relay Bus
//!
//! Publish/subscribe layer shared by every bridge component. Provides:
//! - A `Broker` trait with an in-memory implementation (tokio broadcast)
//! - `BusClient`: namespace-checked publish/subscribe with bounded reconnect
//! - Wire messages for bootstrap, readiness and position updates
//! - A single-consumer `Inbox` that merges several subscriptions
//!
//! ## Namespaces
//!
//! ```text
//!   strategy session                          controller side
//!  ┌──────────────────────┐               ┌──────────────────────────┐
//!  │ strategy:market-data │◄──┐       ┌───│ backtest:market-data:<id>│
//!  │ strategy:signal      │───┼─Proxy─┼──►│ backtest:signal:<id>     │
//!  │ strategy:historical- │   │       │   │ backtest:historical-data:│
//!  │   data:request/resp  │◄──┘       └──►│   request/response       │
//!  └──────────────────────┘               │ backtest:strategy-ready  │
//!       local broker                      └──────────────────────────┘
//!                                               global broker
//! ```
//!
//! Every client carries a `ChannelPolicy`; touching a channel outside it fails
//! with `NamespaceViolation` before any I/O.

pub mod backoff;
pub mod broker;
pub mod channels;
pub mod client;
pub mod envelope;
pub mod error;
pub mod inbox;
pub mod messages;

// Re-export commonly used types
pub use backoff::BackoffPolicy;
pub use broker::{Broker, InMemoryBroker, Subscription};
pub use channels::{ChannelPolicy, ChannelRoutes, Channels, Namespace};
pub use client::BusClient;
pub use envelope::ChannelMessage;
pub use error::{BusError, ProtocolError, Result};
pub use inbox::Inbox;
pub use messages::{
    HistoricalBar, HistoricalBars, HistoricalDataRequest, HistoricalDataResponse, PositionUpdate,
    ReadinessRecord,
};
