//! Position summary: pure functions over a position list and equity curve.
//!
//! No dependencies on the optimizer or strategy code.

use serde::{Deserialize, Serialize};
use tradegrid_core::domain::{EquityCurve, Position};

/// Aggregate statistics for one backtest.
///
/// Means over an empty set are 0.0. A loser is any position with profit
/// at or below zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSummary {
    pub trades: usize,
    pub winners: usize,
    pub profit_total: f64,
    pub profit_mean: f64,
    pub winners_mean: f64,
    pub losers_mean: f64,
    /// Last equity value, when an equity curve was simulated.
    pub final_equity: Option<f64>,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Deepest peak-to-trough decline of the equity curve, as a negative fraction.
    pub max_drawdown: f64,
}

impl PositionSummary {
    pub fn compute(positions: &[Position], equity: Option<&EquityCurve>) -> Self {
        let profits: Vec<f64> = positions.iter().map(|p| p.profit).collect();
        let winners: Vec<f64> = profits.iter().copied().filter(|&p| p > 0.0).collect();
        let losers: Vec<f64> = profits.iter().copied().filter(|&p| p <= 0.0).collect();
        let curve = equity.map(EquityCurve::values).unwrap_or_default();

        Self {
            trades: positions.len(),
            winners: winners.len(),
            profit_total: profits.iter().sum(),
            profit_mean: mean(&profits),
            winners_mean: mean(&winners),
            losers_mean: mean(&losers),
            final_equity: equity.and_then(EquityCurve::final_equity),
            win_rate: win_rate(positions),
            profit_factor: profit_factor(positions),
            max_drawdown: max_drawdown(&curve),
        }
    }
}

/// Shorthand for [`PositionSummary::compute`].
pub fn analyze_positions(positions: &[Position], equity: Option<&EquityCurve>) -> PositionSummary {
    PositionSummary::compute(positions, equity)
}

// ─── Individual metric functions ────────────────────────────────────

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Maximum drawdown as a negative fraction (e.g. -0.2 = 20% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of positions with positive profit.
pub fn win_rate(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let winners = positions.iter().filter(|p| p.is_winner()).count();
    winners as f64 / positions.len() as f64
}

/// Gross profit / gross loss.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(positions: &[Position]) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = positions
        .iter()
        .filter(|p| p.profit > 0.0)
        .map(|p| p.profit)
        .sum();
    let gross_loss: f64 = positions
        .iter()
        .filter(|p| p.profit < 0.0)
        .map(|p| p.profit.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}
