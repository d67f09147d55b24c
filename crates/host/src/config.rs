use relay_bus::BackoffPolicy;
use rust_decimal::Decimal;
use std::time::Duration;

/// Session-side timings and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    /// How long decisions stay blocked waiting for the bootstrap window
    pub bootstrap_timeout_ms: u64,
    /// Size used when a native payload carries none
    pub default_size: Decimal,
    pub inbox_capacity: usize,
    /// Reconnect policy for the Proxy's global client
    pub backoff: BackoffPolicy,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_ms: 5_000,
            default_size: Decimal::ONE,
            inbox_capacity: 1024,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl HostConfig {
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }
}
