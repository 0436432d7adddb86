//! Channel breakout.
//!
//! Goes long when the close breaks above the prior `period`-bar high, short
//! when it breaks below the prior low, and holds the last breakout direction
//! in between.

use chrono::{DateTime, Utc};

use super::{cut, resolve_periods, PeriodParams, Strategy, StrategyError};
use crate::domain::{BarSeries, Instrument, SignalSeries};
use crate::indicators::{Donchian, Indicator, IndicatorValues};

#[derive(Debug, Clone)]
pub struct ChannelBreakout {
    bars: BarSeries,
    period: usize,
}

impl ChannelBreakout {
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Strategy for ChannelBreakout {
    const NAME: &'static str = "ChannelBreakout";

    fn new(
        _instrument: &Instrument,
        bars: BarSeries,
        periods: &PeriodParams,
        start_date: Option<DateTime<Utc>>,
    ) -> Result<Self, StrategyError> {
        let resolved = resolve_periods(Self::NAME, periods, &["period"])?;
        Ok(Self {
            bars: cut(bars, start_date),
            period: resolved[0],
        })
    }

    fn bars(&self) -> &BarSeries {
        &self.bars
    }

    fn generate_signals(&self) -> SignalSeries {
        let bars = self.bars.bars();
        let upper = Donchian::upper(self.period).compute(bars);
        let lower = Donchian::lower(self.period).compute(bars);

        let mut state = 0i8;
        let values: Vec<i8> = bars
            .iter()
            .zip(upper.iter().zip(&lower))
            .map(|(bar, (&hi, &lo))| {
                if bar.close > hi {
                    state = 1;
                } else if bar.close < lo {
                    state = -1;
                }
                state
            })
            .collect();

        let mut indicators = IndicatorValues::new();
        indicators.insert("channel_upper", upper);
        indicators.insert("channel_lower", lower);

        SignalSeries::from_values(bars, &values, indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::bars_from_closes;

    fn build(closes: &[f64], periods: PeriodParams) -> Result<ChannelBreakout, StrategyError> {
        ChannelBreakout::new(
            &Instrument::parse("SPY"),
            BarSeries::new("SPY", bars_from_closes(closes)).unwrap(),
            &periods,
            None,
        )
    }

    #[test]
    fn breakout_holds_direction_until_opposite_break() {
        // Synthetic highs/lows sit one point outside open/close.
        let closes = [10.0, 10.0, 10.0, 14.0, 13.0, 12.5, 5.0, 6.0];
        let s = build(&closes, PeriodParams::Single(2)).unwrap().generate_signals();
        let values: Vec<i8> = s.rows().iter().map(|r| r.signal).collect();
        assert_eq!(values, vec![0, 0, 0, 1, 1, 1, -1, -1]);
    }

    #[test]
    fn accepts_named_and_ordered_single_period() {
        let closes = [1.0, 2.0, 3.0];
        assert_eq!(build(&closes, PeriodParams::Ordered(vec![3])).unwrap().period(), 3);
        let named = PeriodParams::Named([("period".to_string(), 4)].into());
        assert_eq!(build(&closes, named).unwrap().period(), 4);
    }

    #[test]
    fn rejects_two_periods() {
        let err = build(&[1.0], PeriodParams::Ordered(vec![3, 5])).unwrap_err();
        assert!(matches!(err, StrategyError::WrongPeriodCount { expected: 1, got: 2, .. }));
    }
}
