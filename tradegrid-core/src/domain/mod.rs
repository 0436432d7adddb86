//! Domain types for tradegrid

pub mod bar;
pub mod equity;
pub mod instrument;
pub mod position;
pub mod signal;

pub use bar::{Bar, BarError, BarSeries, MarketDataSource};
pub use equity::{EquityCurve, EquityPoint};
pub use instrument::{Instrument, InstrumentKind};
pub use position::{CloseReason, Direction, Position};
pub use signal::{Run, Runs, SignalRow, SignalSeries};
