use serde::Serialize;
use std::fmt;

use crate::error::{ControllerError, Result};

/// Lifecycle of one backtest session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerState {
    Idle,
    AwaitingReadiness,
    Streaming,
    Draining,
    Shutdown,
}

impl ControllerState {
    /// Forward edges only; any state may shut down
    pub fn can_transition_to(self, next: ControllerState) -> bool {
        use ControllerState::*;
        matches!(
            (self, next),
            (Idle, AwaitingReadiness)
                | (AwaitingReadiness, Streaming)
                | (Streaming, Draining)
                | (Draining, Shutdown)
                | (Idle | AwaitingReadiness | Streaming, Shutdown)
        )
    }

    pub fn transition(self, next: ControllerState) -> Result<ControllerState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ControllerError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ControllerState::Shutdown
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Idle => "IDLE",
            ControllerState::AwaitingReadiness => "AWAITING_READINESS",
            ControllerState::Streaming => "STREAMING",
            ControllerState::Draining => "DRAINING",
            ControllerState::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ControllerState::*;

    #[test]
    fn test_happy_path() {
        let mut state = Idle;
        for next in [AwaitingReadiness, Streaming, Draining, Shutdown] {
            state = state.transition(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_any_state_can_shut_down() {
        for state in [Idle, AwaitingReadiness, Streaming, Draining] {
            assert!(state.can_transition_to(Shutdown), "{state}");
        }
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(matches!(
            Idle.transition(Streaming),
            Err(ControllerError::InvalidTransition { from: Idle, to: Streaming })
        ));
        assert!(!Streaming.can_transition_to(AwaitingReadiness));
        assert!(!Draining.can_transition_to(Streaming));
        assert!(!Shutdown.can_transition_to(Idle));
        assert!(!Shutdown.can_transition_to(Shutdown));
    }
}
