//! Strategy plug-in contract.
//!
//! A strategy is built from (instrument, bar series, periods, optional start
//! cutoff) and produces one [`SignalSeries`]. It never sees positions or
//! equity; the engine consumes its output through this trait alone.

pub mod breakout;
pub mod ma_cross;

pub use breakout::ChannelBreakout;
pub use ma_cross::MaCross;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BarSeries, Instrument, SignalSeries};

pub trait Strategy: Sized + Send {
    /// Name for logs and reports.
    const NAME: &'static str;

    /// Validate `periods` and capture the bars to evaluate. With a
    /// `start_date`, bars before it are dropped before any indicator runs.
    fn new(
        instrument: &Instrument,
        bars: BarSeries,
        periods: &PeriodParams,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<Self, StrategyError>;

    /// The bars the signal series is aligned with.
    fn bars(&self) -> &BarSeries;

    /// Must be deterministic for the same bars and periods.
    fn generate_signals(&self) -> SignalSeries;
}

/// Period parameters handed to a strategy constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeriodParams {
    /// Positional periods, shortest first. What the optimizer passes.
    Ordered(Vec<i64>),
    /// Periods by name, e.g. `{"short": 10, "long": 50}`.
    Named(BTreeMap<String, i64>),
    /// A bare period.
    Single(i64),
}

impl PeriodParams {
    pub fn len(&self) -> usize {
        match self {
            Self::Ordered(v) => v.len(),
            Self::Named(m) => m.len(),
            Self::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Ordered(_) => "ordered",
            Self::Named(_) => "named",
            Self::Single(_) => "single",
        }
    }
}

impl From<Vec<i64>> for PeriodParams {
    fn from(periods: Vec<i64>) -> Self {
        Self::Ordered(periods)
    }
}

impl From<&[i64]> for PeriodParams {
    fn from(periods: &[i64]) -> Self {
        Self::Ordered(periods.to_vec())
    }
}

/// Strategy configuration errors. Raised at construction, before any bar is read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StrategyError {
    #[error("{strategy} needs {expected} period(s), got {got}")]
    WrongPeriodCount {
        strategy: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{strategy}: named periods missing required value \"{name}\"")]
    MissingPeriod {
        strategy: &'static str,
        name: &'static str,
    },

    #[error("{strategy}: unsupported period parameters ({shape}), expecting {expected}")]
    UnsupportedParams {
        strategy: &'static str,
        shape: &'static str,
        expected: &'static str,
    },

    #[error("{strategy}: period \"{name}\" must be positive, got {value}")]
    InvalidPeriod {
        strategy: &'static str,
        name: &'static str,
        value: i64,
    },
}

/// Resolve `names.len()` periods from positional or named parameters.
///
/// Positional input maps onto `names` in order. Used by strategies that
/// need two or more periods; single-period strategies handle the bare case.
pub(crate) fn resolve_periods(
    strategy: &'static str,
    periods: &PeriodParams,
    names: &[&'static str],
) -> Result<Vec<usize>, StrategyError> {
    let raw: Vec<(&'static str, i64)> = match periods {
        PeriodParams::Ordered(values) => {
            if values.len() != names.len() {
                return Err(StrategyError::WrongPeriodCount {
                    strategy,
                    expected: names.len(),
                    got: values.len(),
                });
            }
            names.iter().copied().zip(values.iter().copied()).collect()
        }
        PeriodParams::Named(map) => {
            if map.len() != names.len() {
                return Err(StrategyError::WrongPeriodCount {
                    strategy,
                    expected: names.len(),
                    got: map.len(),
                });
            }
            names
                .iter()
                .map(|&name| {
                    map.get(name)
                        .map(|&v| (name, v))
                        .ok_or(StrategyError::MissingPeriod { strategy, name })
                })
                .collect::<Result<_, _>>()?
        }
        PeriodParams::Single(value) if names.len() == 1 => vec![(names[0], *value)],
        other => {
            return Err(StrategyError::UnsupportedParams {
                strategy,
                shape: other.shape(),
                expected: "ordered or named periods",
            })
        }
    };

    raw.into_iter()
        .map(|(name, value)| {
            usize::try_from(value)
                .ok()
                .filter(|&p| p > 0)
                .ok_or(StrategyError::InvalidPeriod {
                    strategy,
                    name,
                    value,
                })
        })
        .collect()
}

/// Apply an optional start cutoff to a bar series.
pub(crate) fn cut(bars: BarSeries, start_date: Option<DateTime<Utc>>) -> BarSeries {
    match start_date {
        Some(cutoff) => bars.since(cutoff),
        None => bars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["short", "long"];

    #[test]
    fn ordered_periods_map_by_position() {
        let p = PeriodParams::Ordered(vec![10, 50]);
        assert_eq!(resolve_periods("T", &p, NAMES), Ok(vec![10, 50]));
    }

    #[test]
    fn named_periods_map_by_name() {
        let p = PeriodParams::Named(BTreeMap::from([
            ("long".to_string(), 50),
            ("short".to_string(), 10),
        ]));
        assert_eq!(resolve_periods("T", &p, NAMES), Ok(vec![10, 50]));
    }

    #[test]
    fn too_few_periods() {
        let p = PeriodParams::Ordered(vec![10]);
        assert_eq!(
            resolve_periods("T", &p, NAMES),
            Err(StrategyError::WrongPeriodCount {
                strategy: "T",
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn missing_named_period() {
        let p = PeriodParams::Named(BTreeMap::from([
            ("short".to_string(), 10),
            ("slow".to_string(), 50),
        ]));
        assert_eq!(
            resolve_periods("T", &p, NAMES),
            Err(StrategyError::MissingPeriod {
                strategy: "T",
                name: "long"
            })
        );
    }

    #[test]
    fn single_is_unsupported_for_two_periods() {
        let err = resolve_periods("T", &PeriodParams::Single(5), NAMES).unwrap_err();
        assert!(matches!(err, StrategyError::UnsupportedParams { shape: "single", .. }));
    }

    #[test]
    fn non_positive_period_rejected() {
        let p = PeriodParams::Ordered(vec![0, 50]);
        assert!(matches!(
            resolve_periods("T", &p, NAMES),
            Err(StrategyError::InvalidPeriod { name: "short", value: 0, .. })
        ));
    }

    #[test]
    fn period_params_deserialize_untagged() {
        let ordered: PeriodParams = serde_json::from_str("[5, 20]").unwrap();
        assert_eq!(ordered, PeriodParams::Ordered(vec![5, 20]));
        let named: PeriodParams = serde_json::from_str(r#"{"short": 5, "long": 20}"#).unwrap();
        assert_eq!(named.len(), 2);
        let single: PeriodParams = serde_json::from_str("14").unwrap();
        assert_eq!(single, PeriodParams::Single(14));
    }
}
