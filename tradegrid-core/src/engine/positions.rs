//! Position builder: turns signal runs into closed positions.
//!
//! Each maximal run of a non-zero signal becomes at most one position:
//! entered at the close of the run's first bar, exited at the close of the
//! bar after the run ends. Runs shorter than two bars, flat runs, and runs
//! whose prices are undefined at the series edges produce nothing.
//!
//! With stop-loss / take-profit distances configured, the bars after entry
//! are scanned for the first trigger crossing; the earliest trigger closes
//! the position at its trigger price. A stop and a take on the same bar
//! resolve to the stop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::domain::{Bar, CloseReason, Direction, Position, Run, SignalSeries};

/// Optional early-exit overrides, with distances in pips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitRules {
    pub pip_size: f64,
    pub stop_loss: Option<u32>,
    pub take_profit: Option<u32>,
}

impl ExitRules {
    /// No overrides; every position closes on its signal.
    pub fn signal_only(pip_size: f64) -> Self {
        Self {
            pip_size,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn with_stop_loss(mut self, pips: u32) -> Self {
        self.stop_loss = Some(pips);
        self
    }

    pub fn with_take_profit(mut self, pips: u32) -> Self {
        self.take_profit = Some(pips);
        self
    }

    pub fn is_active(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some()
    }

    /// Absolute stop price for an entry.
    pub fn stop_price(&self, direction: Direction, entry: f64) -> Option<f64> {
        self.stop_loss
            .map(|pips| entry - direction.sign() * self.pip_size * f64::from(pips))
    }

    /// Absolute take-profit price for an entry.
    pub fn take_price(&self, direction: Direction, entry: f64) -> Option<f64> {
        self.take_profit
            .map(|pips| entry + direction.sign() * self.pip_size * f64::from(pips))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PositionError {
    #[error("signal series has {signals} rows but bar slice has {bars}")]
    LengthMismatch { signals: usize, bars: usize },

    #[error("invalid direction {value} in run {run_id}, must be -1 or 1")]
    InvalidDirection { value: i8, run_id: u32 },
}

/// Where and why a position closed.
struct Exit {
    time: DateTime<Utc>,
    price: f64,
    bars_held: usize,
    reason: CloseReason,
}

/// Build the chronological position list for `signals` over `bars`.
///
/// `bars` must be the exact slice the signals were generated from.
pub fn build_positions(
    signals: &SignalSeries,
    bars: &[Bar],
    rules: &ExitRules,
) -> Result<Vec<Position>, PositionError> {
    if signals.len() != bars.len() {
        return Err(PositionError::LengthMismatch {
            signals: signals.len(),
            bars: bars.len(),
        });
    }

    let mut positions = Vec::new();
    for run in signals.runs() {
        if let Some(position) = position_for_run(run, bars, rules)? {
            positions.push(position);
        }
    }
    Ok(positions)
}

fn position_for_run(
    run: Run<'_>,
    bars: &[Bar],
    rules: &ExitRules,
) -> Result<Option<Position>, PositionError> {
    let (Some(first), Some(last)) = (run.first(), run.last()) else {
        return Ok(None);
    };
    if run.len() < 2 || first.signal == 0 {
        return Ok(None);
    }
    let direction =
        Direction::try_from(first.signal).map_err(|value| PositionError::InvalidDirection {
            value,
            run_id: first.run_id,
        })?;

    let open_price = first.close;
    let Some(signal_close) = last.next_close.filter(|_| !open_price.is_nan()) else {
        trace!(run_id = first.run_id, "skipping run with undefined entry/exit price");
        return Ok(None);
    };

    // The entry bar itself is excluded: it closed at the entry price.
    let held = &bars[run.start + 1..run.start + run.len()];
    let Some((max_high, min_low)) = extremes(held) else {
        trace!(run_id = first.run_id, "skipping run with undefined excursions");
        return Ok(None);
    };
    let (favorable, adverse) = match direction {
        Direction::Long => (max_high - open_price, open_price - min_low),
        Direction::Short => (open_price - min_low, max_high - open_price),
    };

    let exit = first_trigger(direction, open_price, held, rules).unwrap_or(Exit {
        time: last.timestamp,
        price: signal_close,
        bars_held: run.len(),
        reason: CloseReason::Signal,
    });

    let profit = match direction {
        Direction::Long => exit.price - open_price,
        Direction::Short => open_price - exit.price,
    };

    Ok(Some(Position {
        open_time: first.timestamp,
        close_time: exit.time,
        open_price,
        close_price: exit.price,
        direction,
        bars_held: exit.bars_held,
        profit,
        favorable,
        adverse,
        close_reason: exit.reason,
    }))
}

/// Highest high and lowest low, ignoring undefined prices.
fn extremes(bars: &[Bar]) -> Option<(f64, f64)> {
    let max_high = bars
        .iter()
        .map(|b| b.high)
        .filter(|h| !h.is_nan())
        .reduce(f64::max)?;
    let min_low = bars
        .iter()
        .map(|b| b.low)
        .filter(|l| !l.is_nan())
        .reduce(f64::min)?;
    Some((max_high, min_low))
}

/// Scan `held` (bars after entry) for the first stop or take crossing.
fn first_trigger(
    direction: Direction,
    entry: f64,
    held: &[Bar],
    rules: &ExitRules,
) -> Option<Exit> {
    if !rules.is_active() {
        return None;
    }
    let stop = rules.stop_price(direction, entry);
    let take = rules.take_price(direction, entry);

    let adverse_hit = |bar: &Bar, level: f64| match direction {
        Direction::Long => bar.low <= level,
        Direction::Short => bar.high >= level,
    };
    let favorable_hit = |bar: &Bar, level: f64| match direction {
        Direction::Long => bar.high >= level,
        Direction::Short => bar.low <= level,
    };

    held.iter().enumerate().find_map(|(k, bar)| {
        // k = 0 is the second bar of the run, so k + 2 bars have been held.
        let close_at = |price: f64, reason: CloseReason| Exit {
            time: bar.timestamp,
            price,
            bars_held: k + 2,
            reason,
        };
        match (stop, take) {
            (Some(level), _) if adverse_hit(bar, level) => {
                Some(close_at(level, CloseReason::StopLoss))
            }
            (_, Some(level)) if favorable_hit(bar, level) => {
                Some(close_at(level, CloseReason::TakeProfit))
            }
            _ => None,
        }
    })
}
