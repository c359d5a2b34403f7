//! Domain types: bars, signals, positions.

pub mod bar;
pub mod position;
pub mod signal;

pub use bar::Bar;
pub use position::{Position, PositionId, Trailing};
pub use signal::{Direction, ExitLevels, Signal, StrategyKind};
