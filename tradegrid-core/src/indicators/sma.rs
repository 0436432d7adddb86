//! Simple Moving Average of close prices.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut out = vec![f64::NAN; n];

        // Running sum over defined closes, plus a count of undefined closes
        // inside the window. A window holding any NaN yields NaN.
        let mut sum = 0.0;
        let mut nan_count = 0usize;
        for i in 0..n {
            let entering = bars[i].close;
            if entering.is_nan() {
                nan_count += 1;
            } else {
                sum += entering;
            }

            if i >= self.period {
                let leaving = bars[i - self.period].close;
                if leaving.is_nan() {
                    nan_count -= 1;
                } else {
                    sum -= leaving;
                }
            }

            if i + 1 >= self.period && nan_count == 0 {
                out[i] = sum / self.period as f64;
            }
        }
        out
    }
}
