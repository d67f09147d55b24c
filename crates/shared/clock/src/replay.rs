use chrono::{DateTime, Utc};
use relay_core::Timestamp;
use relay_ports::Clock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Replay clock - position of the backtest in the dataset
///
/// Only the controller calls [`ReplayClock::advance`]. Clones share state, so
/// observers always read the controller's current bar.
#[derive(Clone)]
pub struct ReplayClock {
    inner: Arc<ReplayState>,
}

struct ReplayState {
    index: AtomicUsize,
    time: RwLock<Timestamp>,
}

impl ReplayClock {
    /// Create a clock parked at bar 0 with the given start time
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(ReplayState {
                index: AtomicUsize::new(0),
                time: RwLock::new(start),
            }),
        }
    }

    /// Move to `index`, stamped with that bar's timestamp
    ///
    /// Replay never runs backwards; an older index is ignored.
    pub fn advance(&self, index: usize, time: Timestamp) -> bool {
        let current = self.inner.index.load(Ordering::Acquire);
        if index < current {
            log::warn!(
                "[ReplayClock] ignoring rewind from {} to {}",
                current,
                index
            );
            return false;
        }
        if let Ok(mut guard) = self.inner.time.write() {
            *guard = time;
        }
        self.inner.index.store(index, Ordering::Release);
        true
    }

    /// Index of the bar currently being replayed
    pub fn index(&self) -> usize {
        self.inner.index.load(Ordering::Acquire)
    }
}

impl Clock for ReplayClock {
    fn now(&self) -> Timestamp {
        match self.inner.time.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn name(&self) -> &str {
        "ReplayClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_advance_is_shared() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let clock = ReplayClock::new(start);
        let observer = clock.clone();

        assert!(clock.advance(5, start + Duration::minutes(5)));
        assert_eq!(observer.index(), 5);
        assert_eq!(observer.now(), start + Duration::minutes(5));
    }

    #[test]
    fn test_no_rewind() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let clock = ReplayClock::new(start);
        clock.advance(3, start + Duration::minutes(3));

        assert!(!clock.advance(2, start + Duration::minutes(2)));
        assert_eq!(clock.index(), 3);
        assert_eq!(clock.now(), start + Duration::minutes(3));
    }
}
