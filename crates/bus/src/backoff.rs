use std::time::Duration;

/// Bounded exponential backoff for reconnects
///
/// Each delay doubles the previous one, capped at `max_delay`, for at most
/// `max_attempts` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max_delay,
            max_attempts,
        }
    }

    /// Delays to wait before each attempt, in order
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let max_delay = self.max_delay;
        std::iter::successors(Some(self.initial.min(max_delay)), move |delay| {
            Some((*delay * 2).min(max_delay))
        })
        .take(self.max_attempts as usize)
    }

    /// Sum of all delays
    pub fn total(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(50),
            max_delay: Duration::from_millis(1000),
            max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays() {
        let delays: Vec<_> = BackoffPolicy::default().delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(200)
            ]
        );
        assert_eq!(BackoffPolicy::default().total(), Duration::from_millis(350));
    }

    #[test]
    fn test_delays_are_capped() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(250), 4);
        let delays: Vec<_> = policy.delays().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 250, 250]);
    }

    #[test]
    fn test_zero_attempts() {
        let policy = BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(50), 0);
        assert_eq!(policy.delays().count(), 0);
    }
}
