//! tradegrid runner: parameter grids, backtest pipeline, parallel optimizer.
//!
//! This crate builds on `tradegrid-core` to provide:
//! - Range specs and lazily enumerated parameter grids
//! - The per-combination pipeline (signals, positions, equity, summary)
//! - A rayon-backed optimizer with ranking helpers
//! - TOML configuration for sweeps

pub mod config;
pub mod grid;
pub mod metrics;
pub mod optimizer;
pub mod runner;

pub use config::{ConfigError, OptimizerConfig, PortfolioSettings};
pub use grid::{Combinations, GridError, ParameterCombination, ParameterGrid, RangeSpec};
pub use metrics::{analyze_positions, PositionSummary};
pub use optimizer::{OptimizationResult, OptimizeError, Optimizer};
pub use runner::{run_backtest, BacktestOutcome, RunError};
