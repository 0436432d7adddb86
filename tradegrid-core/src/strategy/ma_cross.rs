//! Moving average cross.
//!
//! Long while the short SMA is above the long SMA, short while it is below,
//! flat when they are equal or either average is still warming up.

use chrono::{DateTime, Utc};

use super::{cut, resolve_periods, PeriodParams, Strategy, StrategyError};
use crate::domain::{BarSeries, Instrument, SignalSeries};
use crate::indicators::{Indicator, IndicatorValues, Sma};

#[derive(Debug, Clone)]
pub struct MaCross {
    bars: BarSeries,
    short: Sma,
    long: Sma,
}

impl MaCross {
    pub fn short_period(&self) -> usize {
        self.short.period()
    }

    pub fn long_period(&self) -> usize {
        self.long.period()
    }
}

impl Strategy for MaCross {
    const NAME: &'static str = "MaCross";

    fn new(
        _instrument: &Instrument,
        bars: BarSeries,
        periods: &PeriodParams,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<Self, StrategyError> {
        let resolved = resolve_periods(Self::NAME, periods, &["short", "long"])?;
        Ok(Self {
            bars: cut(bars, start_date),
            short: Sma::new(resolved[0]),
            long: Sma::new(resolved[1]),
        })
    }

    fn bars(&self) -> &BarSeries {
        &self.bars
    }

    fn generate_signals(&self) -> SignalSeries {
        let bars = self.bars.bars();
        let short_mavg = self.short.compute(bars);
        let long_mavg = self.long.compute(bars);

        // Nothing is read before the short period has elapsed; NaN
        // comparisons are false and fall through to flat.
        let warmup = self.short.period();
        let values: Vec<i8> = short_mavg
            .iter()
            .zip(&long_mavg)
            .enumerate()
            .map(|(i, (&s, &l))| {
                if i < warmup {
                    0
                } else if s > l {
                    1
                } else if s < l {
                    -1
                } else {
                    0
                }
            })
            .collect();

        let mut indicators = IndicatorValues::new();
        indicators.insert("short_mavg", short_mavg);
        indicators.insert("long_mavg", long_mavg);

        SignalSeries::from_values(bars, &values, indicators)
    }
}
