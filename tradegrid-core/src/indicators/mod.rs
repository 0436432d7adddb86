//! Indicators: pure functions from a bar slice to a numeric series.
//!
//! Every indicator returns one value per bar. Bars without enough history
//! carry `f64::NAN`. No value at bar t may depend on bars after t.

pub mod donchian;
pub mod sma;

pub use donchian::{Donchian, DonchianBand};
pub use sma::Sma;

use std::collections::HashMap;

use crate::domain::Bar;

pub trait Indicator: Send + Sync {
    /// Column name, e.g. `"sma_20"`.
    fn name(&self) -> &str;

    /// Number of leading bars that are always NaN.
    fn lookback(&self) -> usize;

    /// Compute the series. Output length equals `bars.len()`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Named indicator columns attached to a signal series for charting and
/// inspection. Not read by the position builder.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at `bar_index`, `None` if the column or index is missing.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-10,
        "assert_approx failed: actual={actual}, expected={expected}"
    );
}
