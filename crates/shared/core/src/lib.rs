//! Relay Core Domain
//!
//! Pure domain types for the strategy execution bridge.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    Fill, MarketBar, PositionSide, PositionSnapshot, Side, Signal, SignalAction,
};
pub use values::{Price, Quantity, SessionId, Symbol, Timestamp};
