//! Donchian channel over the bars *before* the current one.
//!
//! Upper at bar t is max(high[t-period..t]), lower is min(low[t-period..t]).
//! Excluding bar t lets a close above the upper band read as a breakout.
//! Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        Self::with_band(period, DonchianBand::Upper)
    }

    pub fn lower(period: usize) -> Self {
        Self::with_band(period, DonchianBand::Lower)
    }

    fn with_band(period: usize, band: DonchianBand) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        let side = match band {
            DonchianBand::Upper => "upper",
            DonchianBand::Lower => "lower",
        };
        Self {
            period,
            band,
            name: format!("donchian_{side}_{period}"),
        }
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|t| {
                if t < self.period {
                    return f64::NAN;
                }
                let window = &bars[t - self.period..t];
                let extreme = match self.band {
                    DonchianBand::Upper => window
                        .iter()
                        .map(|b| b.high)
                        .try_fold(f64::NEG_INFINITY, |acc, h| (!h.is_nan()).then(|| acc.max(h))),
                    DonchianBand::Lower => window
                        .iter()
                        .map(|b| b.low)
                        .try_fold(f64::INFINITY, |acc, l| (!l.is_nan()).then(|| acc.min(l))),
                };
                extreme.unwrap_or(f64::NAN)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;
    use crate::synthetic::bars_from_closes;

    #[test]
    fn upper_excludes_current_bar() {
        // bars_from_closes: high = max(open, close) + 1
        let bars = bars_from_closes(&[10.0, 12.0, 11.0, 20.0]);
        let upper = Donchian::upper(2).compute(&bars);
        assert!(upper[0].is_nan());
        assert!(upper[1].is_nan());
        assert_approx(upper[2], 13.0);
        assert_approx(upper[3], 13.0);
    }

    #[test]
    fn lower_tracks_prior_lows() {
        let bars = bars_from_closes(&[10.0, 12.0, 11.0, 5.0, 6.0]);
        let lower = Donchian::lower(2).compute(&bars);
        assert_approx(lower[2], 9.0);
        assert_approx(lower[3], 9.0);
        assert_approx(lower[4], 4.0);
    }

    #[test]
    fn nan_in_window_is_nan() {
        let mut bars = bars_from_closes(&[10.0, 12.0, 11.0, 13.0]);
        bars[1].high = f64::NAN;
        let upper = Donchian::upper(2).compute(&bars);
        assert!(upper[2].is_nan());
        assert!(upper[3].is_nan());
    }

    #[test]
    fn names() {
        assert_eq!(Donchian::upper(20).name(), "donchian_upper_20");
        assert_eq!(Donchian::lower(5).name(), "donchian_lower_5");
    }
}
