//! Relay Clock Infrastructure
//!
//! ```text
//! ReplayClock   (bar index, bar timestamp), advanced only by the
//!               backtest controller; every other holder reads it
//! ```

mod replay;

pub use replay::ReplayClock;

// Re-export the Clock trait for convenience
pub use relay_ports::Clock;
