//! Relay Ledger
//!
//! The controller's authoritative portfolio. Signals come in, fills and
//! position snapshots come out:
//!
//! ```text
//! Signal ──► PaperLedger::execute(signal, bar)
//!                 │
//!                 ├── fill price: signal price, or bar close when unset
//!                 ├── BUY/SELL by size, CLOSE_* flattens the whole position
//!                 ▼
//!            SymbolBook::apply_fill ──► realized PnL, avg entry, fees
//!                 │
//!                 ▼
//!            Fill + PositionSnapshot (pushed back to the session)
//! ```

pub mod book;
pub mod paper;

// Re-export main types
pub use book::SymbolBook;
pub use paper::PaperLedger;
