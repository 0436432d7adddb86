//! Parameter grids for period sweeps.
//!
//! One half-open [`RangeSpec`] per tunable period; the grid enumerates their
//! Cartesian product lazily. By default only strictly increasing tuples are
//! kept (short period before long period).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradegrid_core::strategy::PeriodParams;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("range step must not be zero")]
    ZeroStep,

    #[error("range \"{input}\" needs exactly three integers (start, stop, step), got {got}")]
    Arity { input: String, got: usize },

    #[error("range \"{input}\": \"{token}\" is not an integer")]
    NotAnInteger { input: String, token: String },
}

/// A half-open integer range: `start, start + step, ...` up to but
/// excluding `stop`. Negative steps count down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeSpec {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeSpec {
    pub fn new(start: i64, stop: i64, step: i64) -> Result<Self, GridError> {
        if step == 0 {
            return Err(GridError::ZeroStep);
        }
        Ok(Self { start, stop, step })
    }

    /// Number of values the range yields.
    pub fn len(&self) -> usize {
        let (start, stop, step) = (
            i128::from(self.start),
            i128::from(self.stop),
            i128::from(self.step),
        );
        let span = if step > 0 { stop - start } else { start - stop };
        if span <= 0 || step == 0 {
            return 0;
        }
        let step = step.abs();
        usize::try_from((span + step - 1) / step).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The values in order.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).map(move |i| self.start + self.step * i as i64)
    }
}

impl FromStr for RangeSpec {
    type Err = GridError;

    /// Parse `"start, stop, step"`, optionally wrapped in parentheses.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(trimmed);

        let tokens: Vec<&str> = inner.split(',').map(str::trim).collect();
        if tokens.len() != 3 {
            return Err(GridError::Arity {
                input: input.to_string(),
                got: tokens.len(),
            });
        }
        let mut parsed = [0i64; 3];
        for (slot, token) in parsed.iter_mut().zip(&tokens) {
            *slot = token.parse().map_err(|_| GridError::NotAnInteger {
                input: input.to_string(),
                token: token.to_string(),
            })?;
        }
        Self::new(parsed[0], parsed[1], parsed[2])
    }
}

impl TryFrom<&[i64]> for RangeSpec {
    type Error = GridError;

    fn try_from(values: &[i64]) -> Result<Self, Self::Error> {
        match values {
            [start, stop, step] => Self::new(*start, *stop, *step),
            other => Err(GridError::Arity {
                input: format!("{other:?}"),
                got: other.len(),
            }),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.start, self.stop, self.step)
    }
}

/// One tuple of periods, in range order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterCombination(pub Vec<i64>);

impl ParameterCombination {
    pub fn values(&self) -> &[i64] {
        &self.0
    }

    /// Positional periods for a strategy constructor.
    pub fn to_params(&self) -> PeriodParams {
        PeriodParams::Ordered(self.0.clone())
    }

    fn is_strictly_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }
}

impl From<Vec<i64>> for ParameterCombination {
    fn from(values: Vec<i64>) -> Self {
        Self(values)
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

/// The set of combinations to sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    ranges: Vec<RangeSpec>,
    /// Keep only strictly increasing tuples.
    filtered: bool,
}

impl ParameterGrid {
    /// Grid over `ranges`, keeping only strictly increasing tuples.
    pub fn new(ranges: Vec<RangeSpec>) -> Self {
        Self {
            ranges,
            filtered: true,
        }
    }

    /// Grid over the full Cartesian product.
    pub fn unfiltered(ranges: Vec<RangeSpec>) -> Self {
        Self {
            ranges,
            filtered: false,
        }
    }

    /// Parse one `"start, stop, step"` string per period.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self, GridError> {
        let ranges = specs
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(ranges))
    }

    pub fn ranges(&self) -> &[RangeSpec] {
        &self.ranges
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// Size of the unfiltered product.
    pub fn raw_size(&self) -> usize {
        if self.ranges.is_empty() {
            return 0;
        }
        self.ranges
            .iter()
            .map(RangeSpec::len)
            .fold(1usize, usize::saturating_mul)
    }

    /// Number of combinations the grid yields.
    pub fn len(&self) -> usize {
        if self.filtered {
            self.iter().count()
        } else {
            self.raw_size()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Fresh iterator over the combinations, in lexicographic range order.
    pub fn iter(&self) -> Combinations {
        Combinations::new(&self.ranges, self.filtered)
    }
}

impl<'a> IntoIterator for &'a ParameterGrid {
    type Item = ParameterCombination;
    type IntoIter = Combinations;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy odometer over a grid's combinations.
#[derive(Debug, Clone)]
pub struct Combinations {
    axes: Vec<Vec<i64>>,
    cursor: Vec<usize>,
    filtered: bool,
    done: bool,
}

impl Combinations {
    fn new(ranges: &[RangeSpec], filtered: bool) -> Self {
        let axes: Vec<Vec<i64>> = ranges.iter().map(|r| r.values().collect()).collect();
        let done = axes.is_empty() || axes.iter().any(Vec::is_empty);
        Self {
            cursor: vec![0; axes.len()],
            axes,
            filtered,
            done,
        }
    }

    fn current(&self) -> ParameterCombination {
        ParameterCombination(
            self.axes
                .iter()
                .zip(&self.cursor)
                .map(|(axis, &i)| axis[i])
                .collect(),
        )
    }

    /// Step the last axis, carrying into earlier ones.
    fn advance(&mut self) {
        for axis in (0..self.axes.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.axes[axis].len() {
                return;
            }
            self.cursor[axis] = 0;
        }
        self.done = true;
    }
}

impl Iterator for Combinations {
    type Item = ParameterCombination;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let combo = self.current();
            self.advance();
            if !self.filtered || combo.is_strictly_increasing() {
                return Some(combo);
            }
        }
        None
    }
}
