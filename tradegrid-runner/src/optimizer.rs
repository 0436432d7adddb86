//! Parallel parameter sweep.
//!
//! Every combination of the grid is an independent unit: the shared bar
//! series is sliced once, then each unit runs the full pipeline on its own
//! and returns a self-contained outcome. Results are gathered only after
//! all units finish; the first failing unit fails the sweep.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use tradegrid_core::domain::{BarSeries, Instrument};
use tradegrid_core::engine::SizingError;
use tradegrid_core::strategy::Strategy;

use crate::config::{OptimizerConfig, PortfolioSettings};
use crate::grid::{ParameterCombination, ParameterGrid};
use crate::runner::{run_backtest, BacktestOutcome, RunError};

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("portfolio settings unusable for this instrument: {0}")]
    Settings(#[from] SizingError),

    #[error("combination {combination} failed: {source}")]
    Unit {
        combination: ParameterCombination,
        source: RunError,
    },
}

impl OptimizeError {
    /// The combination whose unit failed, if any.
    pub fn combination(&self) -> Option<&ParameterCombination> {
        match self {
            Self::Unit { combination, .. } => Some(combination),
            Self::Settings(_) => None,
        }
    }
}

/// Parameter sweep executor.
///
/// Runs one backtest per grid combination, optionally in parallel.
#[derive(Debug, Clone)]
pub struct Optimizer {
    instrument: Instrument,
    portfolio: PortfolioSettings,
    start_date: Option<DateTime<Utc>>,
    parallel: bool,
}

impl Optimizer {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            portfolio: PortfolioSettings::default(),
            start_date: None,
            parallel: true,
        }
    }

    /// Optimizer for a loaded configuration.
    pub fn from_config(config: &OptimizerConfig) -> Self {
        Self {
            instrument: config.instrument(),
            portfolio: config.portfolio.clone(),
            start_date: config.optimizer.start_date,
            parallel: config.optimizer.parallel,
        }
    }

    pub fn with_portfolio(mut self, portfolio: PortfolioSettings) -> Self {
        self.portfolio = portfolio;
        self
    }

    /// Drop bars before `start_date` before any unit runs.
    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Sweep `grid` with strategy `S`.
    pub fn optimize<S: Strategy>(
        &self,
        bars: &BarSeries,
        grid: &ParameterGrid,
    ) -> Result<OptimizationResult, OptimizeError> {
        self.optimize_with_progress::<S, _>(bars, grid, |_, _, _, _| {})
    }

    /// Sweep with progress reporting.
    ///
    /// The callback is invoked after each unit completes with:
    /// - Number of units completed so far (including this one)
    /// - Total number of units
    /// - The unit's combination and outcome
    ///
    /// In parallel mode callbacks arrive in completion order.
    pub fn optimize_with_progress<S, F>(
        &self,
        bars: &BarSeries,
        grid: &ParameterGrid,
        progress: F,
    ) -> Result<OptimizationResult, OptimizeError>
    where
        S: Strategy,
        F: Fn(usize, usize, &ParameterCombination, &BacktestOutcome) + Send + Sync,
    {
        self.portfolio.validate_for(&self.instrument)?;

        let sliced = match self.start_date {
            Some(cutoff) => bars.since(cutoff),
            None => bars.clone(),
        };
        let combinations: Vec<ParameterCombination> = grid.iter().collect();
        let total = combinations.len();
        info!(
            strategy = S::NAME,
            symbol = %self.instrument.symbol,
            combinations = total,
            bars = sliced.len(),
            parallel = self.parallel,
            "starting optimization"
        );

        let completed = AtomicUsize::new(0);
        let run_unit = |combination: &ParameterCombination| -> Result<_, OptimizeError> {
            let outcome = run_backtest::<S>(
                &self.instrument,
                sliced.clone(),
                &combination.to_params(),
                &self.portfolio,
            )
            .map_err(|source| {
                warn!(%combination, error = %source, "optimization unit failed");
                OptimizeError::Unit {
                    combination: combination.clone(),
                    source,
                }
            })?;
            debug!(
                %combination,
                trades = outcome.trade_count(),
                score = outcome.score,
                "unit finished"
            );
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total, combination, &outcome);
            Ok((combination.clone(), outcome))
        };

        let outcomes: Vec<(ParameterCombination, BacktestOutcome)> = if self.parallel {
            combinations
                .par_iter()
                .map(run_unit)
                .collect::<Result<Vec<_>, OptimizeError>>()?
        } else {
            combinations
                .iter()
                .map(run_unit)
                .collect::<Result<Vec<_>, OptimizeError>>()?
        };

        let result = OptimizationResult::new(outcomes);
        match result.best() {
            Some((combination, score)) => {
                info!(units = result.len(), best = %combination, score, "optimization complete")
            }
            None => info!("optimization complete, grid was empty"),
        }
        Ok(result)
    }
}

/// Results from a parameter sweep.
#[derive(Debug, Clone, Default)]
pub struct OptimizationResult {
    scores: HashMap<ParameterCombination, f64>,
    outcomes: HashMap<ParameterCombination, BacktestOutcome>,
}

impl OptimizationResult {
    fn new(outcomes: Vec<(ParameterCombination, BacktestOutcome)>) -> Self {
        let scores = outcomes
            .iter()
            .map(|(combination, outcome)| (combination.clone(), outcome.score))
            .collect();
        Self {
            scores,
            outcomes: outcomes.into_iter().collect(),
        }
    }

    /// Ranking key per combination.
    pub fn scores(&self) -> &HashMap<ParameterCombination, f64> {
        &self.scores
    }

    /// Full outcome per combination.
    pub fn outcomes(&self) -> &HashMap<ParameterCombination, BacktestOutcome> {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, combination: &ParameterCombination) -> Option<&BacktestOutcome> {
        self.outcomes.get(combination)
    }

    /// Combinations by score, highest first; ties in combination order.
    pub fn ranked(&self) -> Vec<(&ParameterCombination, f64)> {
        let mut sorted: Vec<_> = self.scores.iter().map(|(c, &s)| (c, s)).collect();
        sorted.sort_by(|(ca, sa), (cb, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ca.cmp(cb))
        });
        sorted
    }

    /// Returns the top N combinations by score.
    pub fn top_n(&self, n: usize) -> Vec<(&ParameterCombination, f64)> {
        self.ranked().into_iter().take(n).collect()
    }

    /// Returns the best combination by score.
    pub fn best(&self) -> Option<(&ParameterCombination, f64)> {
        self.ranked().into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradegrid_core::strategy::MaCross;
    use tradegrid_core::synthetic::sine_wave_series;

    fn grid() -> ParameterGrid {
        ParameterGrid::parse(&["5, 15, 5", "20, 40, 10"]).unwrap()
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let bars = sine_wave_series("SPY", 300).unwrap();
        let base = Optimizer::new(Instrument::parse("SPY"));
        let seq = base
            .clone()
            .with_parallelism(false)
            .optimize::<MaCross>(&bars, &grid())
            .unwrap();
        let par = base.optimize::<MaCross>(&bars, &grid()).unwrap();
        assert_eq!(seq.scores(), par.scores());
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn ranked_is_descending() {
        let bars = sine_wave_series("SPY", 300).unwrap();
        let result = Optimizer::new(Instrument::parse("SPY"))
            .optimize::<MaCross>(&bars, &grid())
            .unwrap();
        let ranked = result.ranked();
        for pair in ranked.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(result.best(), ranked.first().copied());
        assert_eq!(result.top_n(2).len(), 2);
    }

    #[test]
    fn ties_break_by_combination() {
        let mut result = OptimizationResult::default();
        result.scores.insert(ParameterCombination(vec![10, 20]), 1.0);
        result.scores.insert(ParameterCombination(vec![5, 20]), 1.0);
        result.scores.insert(ParameterCombination(vec![5, 30]), 2.0);
        let order: Vec<_> = result.ranked().into_iter().map(|(c, _)| c.0.clone()).collect();
        assert_eq!(order, vec![vec![5, 30], vec![5, 20], vec![10, 20]]);
    }

    #[test]
    fn empty_grid_gives_empty_result() {
        let bars = sine_wave_series("SPY", 100).unwrap();
        let grid = ParameterGrid::parse(&["50, 60, 5", "10, 20, 5"]).unwrap();
        let result = Optimizer::new(Instrument::parse("SPY"))
            .optimize::<MaCross>(&bars, &grid)
            .unwrap();
        assert!(result.is_empty());
        assert!(result.best().is_none());
    }
}
