use std::sync::atomic::{AtomicU64, Ordering};

/// Request/response counters (observability only)
#[derive(Debug, Default)]
pub struct ServiceStats {
    requests: AtomicU64,
    responses: AtomicU64,
    failures: AtomicU64,
    malformed: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of `ServiceStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub responses: u64,
    pub failures: u64,
    pub malformed: u64,
    /// Replies the bus refused
    pub send_failures: u64,
}

impl ServiceStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self, success: bool) {
        self.responses.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            responses: self.responses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}
