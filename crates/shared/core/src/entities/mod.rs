mod bar;
mod fill;
mod position;
mod side;
mod signal;

pub use bar::MarketBar;
pub use fill::Fill;
pub use position::{PositionSide, PositionSnapshot};
pub use side::Side;
pub use signal::{Signal, SignalAction};
