//! SignalSeries: per-bar strategy output annotated with run ids.
//!
//! Strategies only decide a raw value per bar. Everything downstream
//! consumers rely on (run ids, entry/exit markers, next-bar close) is derived
//! here once, so every strategy gets identical bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Direction;
use super::Bar;
use crate::indicators::IndicatorValues;

/// One row of a signal series, aligned with one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub timestamp: DateTime<Utc>,
    /// `1` long, `-1` short, `0` flat.
    pub signal: i8,
    /// Increments every time `signal` differs from the previous row.
    pub run_id: u32,
    pub close: f64,
    /// Close of the following bar; `None` on the last bar or when undefined.
    pub next_close: Option<f64>,
    /// Set on the first bar of a transition into a long or short state.
    pub entry: Option<Direction>,
    /// Set on the first bar after a long or short state ends.
    pub exit: Option<Direction>,
}

/// A maximal stretch of rows sharing one run id.
#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    /// Index of the run's first row in the series (and in the bar slice).
    pub start: usize,
    pub rows: &'a [SignalRow],
}

impl<'a> Run<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn signal(&self) -> i8 {
        self.rows.first().map_or(0, |r| r.signal)
    }

    pub fn first(&self) -> Option<&'a SignalRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&'a SignalRow> {
        self.rows.last()
    }
}

/// Signal series for one strategy evaluation. Never mutated after creation.
#[derive(Debug, Clone, Default)]
pub struct SignalSeries {
    rows: Vec<SignalRow>,
    indicators: IndicatorValues,
}

impl SignalSeries {
    /// Derive the full series from raw per-bar values.
    ///
    /// The row before the first bar is treated as flat, so a series opening
    /// long or short starts at run id 1.
    pub fn from_values(bars: &[Bar], values: &[i8], indicators: IndicatorValues) -> Self {
        debug_assert_eq!(bars.len(), values.len());

        let mut rows = Vec::with_capacity(bars.len());
        let mut run_id = 0u32;
        let mut prev: Option<i8> = None;

        for (i, (bar, &signal)) in bars.iter().zip(values).enumerate() {
            if signal != prev.unwrap_or(0) {
                run_id += 1;
            }
            let (entry, exit) = match prev {
                Some(p) => transitions(p, signal),
                None => (None, None),
            };
            let next_close = bars
                .get(i + 1)
                .map(|b| b.close)
                .filter(|c| !c.is_nan());

            rows.push(SignalRow {
                timestamp: bar.timestamp,
                signal,
                run_id,
                close: bar.close,
                next_close,
                entry,
                exit,
            });
            prev = Some(signal);
        }

        Self { rows, indicators }
    }

    pub fn rows(&self) -> &[SignalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Strategy-specific columns (moving averages, channel bands, ...).
    pub fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }

    /// Iterate the maximal runs in chronological order.
    pub fn runs(&self) -> Runs<'_> {
        Runs {
            rows: &self.rows,
            pos: 0,
        }
    }
}

/// Iterator over the runs of a [`SignalSeries`].
pub struct Runs<'a> {
    rows: &'a [SignalRow],
    pos: usize,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let run_id = self.rows.get(start)?.run_id;
        let len = self.rows[start..]
            .iter()
            .take_while(|r| r.run_id == run_id)
            .count();
        self.pos = start + len;
        Some(Run {
            start,
            rows: &self.rows[start..start + len],
        })
    }
}

fn transitions(prev: i8, cur: i8) -> (Option<Direction>, Option<Direction>) {
    let entry = match cur {
        1 if prev != 1 => Some(Direction::Long),
        -1 if prev != -1 => Some(Direction::Short),
        _ => None,
    };
    let exit = match prev {
        1 if cur != 1 => Some(Direction::Long),
        -1 if cur != -1 => Some(Direction::Short),
        _ => None,
    };
    (entry, exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::bars_from_closes;

    fn series(values: &[i8]) -> SignalSeries {
        let closes: Vec<f64> = (0..values.len()).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        SignalSeries::from_values(&bars, values, IndicatorValues::new())
    }

    #[test]
    fn run_ids_increment_on_change() {
        let s = series(&[0, 0, 1, 1, -1, -1, -1, 0]);
        let ids: Vec<u32> = s.rows().iter().map(|r| r.run_id).collect();
        assert_eq!(ids, vec![0, 0, 1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn first_row_compares_against_flat() {
        let s = series(&[1, 1, 0]);
        assert_eq!(s.rows()[0].run_id, 1);
        // Nothing precedes the first bar, so no entry marker there.
        assert_eq!(s.rows()[0].entry, None);
    }

    #[test]
    fn next_close_is_following_bar() {
        let s = series(&[0, 1, 1]);
        assert_eq!(s.rows()[0].next_close, Some(101.0));
        assert_eq!(s.rows()[1].next_close, Some(102.0));
        assert_eq!(s.rows()[2].next_close, None);
    }

    #[test]
    fn flip_marks_exit_and_entry_on_same_bar() {
        let s = series(&[0, 1, -1, 0]);
        assert_eq!(s.rows()[1].entry, Some(Direction::Long));
        assert_eq!(s.rows()[2].exit, Some(Direction::Long));
        assert_eq!(s.rows()[2].entry, Some(Direction::Short));
        assert_eq!(s.rows()[3].exit, Some(Direction::Short));
        assert_eq!(s.rows()[3].entry, None);
    }

    #[test]
    fn runs_group_contiguous_rows() {
        let s = series(&[0, 1, 1, 1, -1, 0, 0]);
        let runs: Vec<(usize, usize, i8)> =
            s.runs().map(|r| (r.start, r.len(), r.signal())).collect();
        assert_eq!(runs, vec![(0, 1, 0), (1, 3, 1), (4, 1, -1), (5, 2, 0)]);
    }

    #[test]
    fn empty_series_has_no_runs() {
        let s = series(&[]);
        assert!(s.is_empty());
        assert_eq!(s.runs().count(), 0);
    }
}
