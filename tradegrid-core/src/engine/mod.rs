//! Backtest engine: signal runs to positions, positions to equity.
//!
//! Both stages are pure and sequential. The runner crate chains them per
//! parameter combination:
//!
//! 1. [`build_positions`]: one position per qualifying signal run, with
//!    optional stop-loss / take-profit overrides
//! 2. [`simulate_equity`]: size each position from available equity and
//!    fold the results into an [`EquityCurve`](crate::domain::EquityCurve)

pub mod equity;
pub mod positions;

pub use equity::{
    equity_delta, simulate_equity, units_available, EquitySettings, MarginModel, SizingError,
};
pub use positions::{build_positions, ExitRules, PositionError};
