//! tradegrid core: bar series, strategies, position building, equity simulation.
//!
//! This crate holds everything one backtest needs:
//! - Domain types (bars, instruments, signal series, positions, equity curves)
//! - Indicators used by the bundled strategies
//! - The strategy contract and two strategies
//! - The engine: signal runs to positions, positions to equity
//!
//! Parameter sweeps and result aggregation live in `tradegrid-runner`.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;
pub mod synthetic;
