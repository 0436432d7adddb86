//! Backtest runner: wires a strategy, the position builder, the equity
//! simulator and the summary together for one set of periods.
//!
//! The optimizer calls [`run_backtest`] once per parameter combination.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradegrid_core::domain::{BarSeries, EquityCurve, Instrument, Position};
use tradegrid_core::engine::{build_positions, simulate_equity, PositionError, SizingError};
use tradegrid_core::strategy::{PeriodParams, Strategy, StrategyError};

use crate::config::PortfolioSettings;
use crate::metrics::PositionSummary;

/// Errors from one pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
    #[error("position error: {0}")]
    Positions(#[from] PositionError),
    #[error("sizing error: {0}")]
    Sizing(#[from] SizingError),
    #[error("encoding result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Current schema version for serialized outcomes.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutcome {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy: String,
    pub symbol: String,
    pub periods: PeriodParams,
    pub positions: Vec<Position>,
    /// Present when the portfolio has an initial equity.
    pub equity: Option<EquityCurve>,
    pub summary: PositionSummary,
    /// Ranking key: final equity when equity is simulated, else summed profit.
    pub score: f64,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestOutcome {
    /// blake3 hex digest of the JSON-encoded positions and equity curve.
    ///
    /// Two runs over the same bars and settings produce the same digest.
    pub fn fingerprint(&self) -> Result<String, RunError> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &(&self.positions, &self.equity))?;
        Ok(hasher.finalize().to_hex().to_string())
    }

    pub fn trade_count(&self) -> usize {
        self.positions.len()
    }
}

/// Run strategy `S` over `bars` with `periods` and portfolio settings.
///
/// The bars are used as given; apply any start cutoff before calling.
pub fn run_backtest<S: Strategy>(
    instrument: &Instrument,
    bars: BarSeries,
    periods: &PeriodParams,
    portfolio: &PortfolioSettings,
) -> Result<BacktestOutcome, RunError> {
    let strategy = S::new(instrument, bars, periods, None)?;
    let signals = strategy.generate_signals();

    let rules = portfolio.exit_rules(instrument);
    let positions = build_positions(&signals, strategy.bars().bars(), &rules)?;

    let equity = match portfolio.equity_settings() {
        Some(settings) => Some(simulate_equity(&positions, instrument, &settings)?),
        None => None,
    };

    let summary = PositionSummary::compute(&positions, equity.as_ref());
    let score = match (&portfolio.initial_equity, &summary.final_equity) {
        (Some(_), Some(final_equity)) => *final_equity,
        // Equity enabled but nothing traded: capital is untouched.
        (Some(initial), None) => *initial,
        (None, _) => summary.profit_total,
    };

    Ok(BacktestOutcome {
        schema_version: SCHEMA_VERSION,
        strategy: S::NAME.to_string(),
        symbol: instrument.symbol.clone(),
        periods: periods.clone(),
        positions,
        equity,
        summary,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradegrid_core::strategy::{ChannelBreakout, MaCross};
    use tradegrid_core::synthetic::sine_wave_series;

    fn spy() -> Instrument {
        Instrument::parse("SPY")
    }

    #[test]
    fn profit_is_the_score_without_equity() {
        let bars = sine_wave_series("SPY", 400).unwrap();
        let outcome = run_backtest::<MaCross>(
            &spy(),
            bars,
            &PeriodParams::Ordered(vec![10, 50]),
            &PortfolioSettings::default(),
        )
        .unwrap();
        assert!(outcome.equity.is_none());
        assert!(outcome.trade_count() > 0);
        assert_eq!(outcome.score, outcome.summary.profit_total);
        assert_eq!(outcome.strategy, "MaCross");
    }

    #[test]
    fn final_equity_is_the_score_with_equity() {
        let bars = sine_wave_series("SPY", 400).unwrap();
        let portfolio = PortfolioSettings::default().with_initial_equity(10_000.0);
        let outcome = run_backtest::<MaCross>(
            &spy(),
            bars,
            &PeriodParams::Ordered(vec![10, 50]),
            &portfolio,
        )
        .unwrap();
        let curve = outcome.equity.as_ref().unwrap();
        assert_eq!(curve.len(), outcome.positions.len() + 1);
        assert_eq!(Some(outcome.score), curve.final_equity());
    }

    #[test]
    fn untraded_run_scores_initial_equity() {
        // Too short for a 50-bar average to warm up.
        let bars = sine_wave_series("SPY", 30).unwrap();
        let portfolio = PortfolioSettings::default().with_initial_equity(2_500.0);
        let outcome = run_backtest::<MaCross>(
            &spy(),
            bars,
            &PeriodParams::Ordered(vec![10, 50]),
            &portfolio,
        )
        .unwrap();
        assert!(outcome.positions.is_empty());
        assert_eq!(outcome.score, 2_500.0);
    }

    #[test]
    fn strategy_errors_propagate() {
        let bars = sine_wave_series("SPY", 30).unwrap();
        let err = run_backtest::<ChannelBreakout>(
            &spy(),
            bars,
            &PeriodParams::Ordered(vec![10, 50]),
            &PortfolioSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Strategy(_)));
    }

    #[test]
    fn fingerprint_is_stable() {
        let run = || {
            run_backtest::<MaCross>(
                &spy(),
                sine_wave_series("SPY", 300).unwrap(),
                &PeriodParams::Ordered(vec![5, 30]),
                &PortfolioSettings::default().with_initial_equity(1_000.0),
            )
            .unwrap()
        };
        let a = run().fingerprint().unwrap();
        let b = run().fingerprint().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
