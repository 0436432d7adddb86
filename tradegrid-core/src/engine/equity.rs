//! Equity simulator.
//!
//! A sequential fold over closed positions. Each position is sized from the
//! equity available at its open, and the resulting profit or loss is added
//! at its close. Positions never overlap, so no two trades share capital.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EquityCurve, EquityPoint, Instrument, Position};

#[derive(Debug, Error, PartialEq)]
pub enum SizingError {
    #[error("cannot size a position at entry price {0}")]
    InvalidPrice(f64),

    #[error("{symbol} is a currency pair; margin ratio and home currency are required")]
    MissingForexSettings { symbol: String },

    #[error("no conversion from {base}/{quote} into home currency {home}")]
    Unimplemented {
        base: String,
        quote: String,
        home: String,
    },
}

/// Leverage settings for currency pairs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarginModel {
    /// Units of exposure per unit of equity.
    pub margin_ratio: Option<f64>,
    pub home_currency: Option<String>,
}

impl MarginModel {
    pub fn new(margin_ratio: f64, home_currency: impl Into<String>) -> Self {
        Self {
            margin_ratio: Some(margin_ratio),
            home_currency: Some(home_currency.into()),
        }
    }

    /// Check that this model can size trades in `instrument`.
    ///
    /// Non-pair instruments always pass. Pairs need both settings and a home
    /// currency that is one of the pair's legs.
    pub fn validate_for(&self, instrument: &Instrument) -> Result<(), SizingError> {
        match self.forex_terms(instrument)? {
            Some(terms) => terms.conversion().map(|_| ()),
            None => Ok(()),
        }
    }

    fn forex_terms<'a>(
        &'a self,
        instrument: &'a Instrument,
    ) -> Result<Option<ForexTerms<'a>>, SizingError> {
        let Some((base, quote)) = instrument.currencies() else {
            return Ok(None);
        };
        match (self.margin_ratio, self.home_currency.as_deref()) {
            (Some(ratio), Some(home)) => Ok(Some(ForexTerms {
                base,
                quote,
                home,
                ratio,
            })),
            _ => Err(SizingError::MissingForexSettings {
                symbol: instrument.symbol.clone(),
            }),
        }
    }
}

/// How profit in quote currency reaches the home currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    /// Home is the base leg; quote-currency profit is divided by price.
    HomeIsBase,
    /// Home is the quote leg; profit is already in home currency.
    HomeIsQuote,
}

struct ForexTerms<'a> {
    base: &'a str,
    quote: &'a str,
    home: &'a str,
    ratio: f64,
}

impl ForexTerms<'_> {
    fn conversion(&self) -> Result<Conversion, SizingError> {
        let home = self.home.to_ascii_uppercase();
        if home == self.base {
            Ok(Conversion::HomeIsBase)
        } else if home == self.quote {
            Ok(Conversion::HomeIsQuote)
        } else {
            Err(SizingError::Unimplemented {
                base: self.base.to_string(),
                quote: self.quote.to_string(),
                home: self.home.to_string(),
            })
        }
    }
}

/// Equity simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquitySettings {
    pub initial_equity: f64,
    /// Restore equity to the starting value before each trade when it has
    /// fallen below; injected capital is tracked in `added_equity`.
    pub top_off: bool,
    pub margin: MarginModel,
}

impl EquitySettings {
    pub fn new(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            top_off: false,
            margin: MarginModel::default(),
        }
    }

    pub fn with_top_off(mut self, top_off: bool) -> Self {
        self.top_off = top_off;
        self
    }

    pub fn with_margin(mut self, margin: MarginModel) -> Self {
        self.margin = margin;
        self
    }
}

/// Whole units affordable with `equity` at `price`.
pub fn units_available(
    instrument: &Instrument,
    margin: &MarginModel,
    equity: f64,
    price: f64,
) -> Result<f64, SizingError> {
    if price == 0.0 || price.is_nan() {
        return Err(SizingError::InvalidPrice(price));
    }
    let terms = margin.forex_terms(instrument)?;
    if equity <= 0.0 {
        return Ok(0.0);
    }
    match terms {
        Some(terms) => match terms.conversion()? {
            Conversion::HomeIsBase => Ok((equity * terms.ratio).floor()),
            Conversion::HomeIsQuote => Ok((equity * terms.ratio / price).floor()),
        },
        None => Ok((equity / price).floor()),
    }
}

/// Change in home-currency equity for `units` of `position`.
pub fn equity_delta(
    instrument: &Instrument,
    margin: &MarginModel,
    position: &Position,
    units: f64,
) -> Result<f64, SizingError> {
    let raw = position.direction.sign() * units * (position.close_price - position.open_price);
    match margin.forex_terms(instrument)? {
        Some(terms) => match terms.conversion()? {
            Conversion::HomeIsBase => Ok(raw / position.close_price),
            Conversion::HomeIsQuote => Ok(raw),
        },
        None => Ok(raw),
    }
}

/// Fold `positions` into an equity curve.
///
/// Empty input yields an empty curve. Otherwise the curve starts with the
/// initial equity at the first open time and gains one point per position.
pub fn simulate_equity(
    positions: &[Position],
    instrument: &Instrument,
    settings: &EquitySettings,
) -> Result<EquityCurve, SizingError> {
    let Some(first) = positions.first() else {
        return Ok(EquityCurve::default());
    };
    settings.margin.validate_for(instrument)?;

    let mut equity = settings.initial_equity;
    let mut added_equity = 0.0;
    let mut points = Vec::with_capacity(positions.len() + 1);
    points.push(EquityPoint {
        timestamp: first.open_time,
        equity,
    });

    for position in positions {
        if settings.top_off && equity < settings.initial_equity {
            added_equity += settings.initial_equity - equity;
            equity = settings.initial_equity;
        }
        let units = units_available(instrument, &settings.margin, equity, position.open_price)?;
        equity += equity_delta(instrument, &settings.margin, position, units)?;
        points.push(EquityPoint {
            timestamp: position.close_time,
            equity,
        });
    }

    Ok(EquityCurve {
        points,
        added_equity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CloseReason, Direction};
    use crate::synthetic::base_timestamp;
    use chrono::Duration;

    fn position(day: i64, direction: Direction, open: f64, close: f64) -> Position {
        let open_time = base_timestamp() + Duration::days(day);
        Position {
            open_time,
            close_time: open_time + Duration::days(2),
            open_price: open,
            close_price: close,
            direction,
            bars_held: 2,
            profit: direction.sign() * (close - open),
            favorable: 0.0,
            adverse: 0.0,
            close_reason: CloseReason::Signal,
        }
    }

    #[test]
    fn empty_positions_give_empty_curve() {
        let curve =
            simulate_equity(&[], &Instrument::parse("SPY"), &EquitySettings::new(1000.0)).unwrap();
        assert!(curve.is_empty());
    }

    #[test]
    fn whole_units_for_plain_instruments() {
        let spy = Instrument::parse("SPY");
        let margin = MarginModel::default();
        assert_eq!(units_available(&spy, &margin, 1000.0, 30.0).unwrap(), 33.0);
        assert_eq!(units_available(&spy, &margin, -5.0, 30.0).unwrap(), 0.0);
        assert_eq!(
            units_available(&spy, &margin, 1000.0, 0.0),
            Err(SizingError::InvalidPrice(0.0))
        );
        assert!(units_available(&spy, &margin, 1000.0, f64::NAN).is_err());
    }

    #[test]
    fn curve_accumulates_sized_profit() {
        let spy = Instrument::parse("SPY");
        let positions = [
            position(0, Direction::Long, 10.0, 12.0),
            position(5, Direction::Short, 20.0, 25.0),
        ];
        let curve = simulate_equity(&positions, &spy, &EquitySettings::new(100.0)).unwrap();
        // 10 units * +2 = 120; then floor(120 / 20) = 6 units * -5 = 90.
        assert_eq!(curve.values(), vec![100.0, 120.0, 90.0]);
        assert_eq!(curve.points[0].timestamp, positions[0].open_time);
        assert_eq!(curve.points[2].timestamp, positions[1].close_time);
        assert_eq!(curve.added_equity, 0.0);
    }

    #[test]
    fn top_off_restores_starting_equity() {
        let spy = Instrument::parse("SPY");
        let positions = [
            position(0, Direction::Long, 10.0, 8.0),
            position(5, Direction::Long, 10.0, 11.0),
        ];
        let settings = EquitySettings::new(100.0).with_top_off(true);
        let curve = simulate_equity(&positions, &spy, &settings).unwrap();
        // 80 after the loss, topped back to 100 before the second trade.
        assert_eq!(curve.values(), vec![100.0, 80.0, 110.0]);
        assert_eq!(curve.added_equity, 20.0);
    }

    #[test]
    fn forex_home_base_divides_by_close() {
        let pair = Instrument::parse("EUR_USD");
        let margin = MarginModel::new(10.0, "EUR");
        assert_eq!(units_available(&pair, &margin, 1000.0, 1.25).unwrap(), 10_000.0);
        let p = position(0, Direction::Long, 1.0, 1.25);
        let delta = equity_delta(&pair, &margin, &p, 10_000.0).unwrap();
        assert!((delta - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn forex_home_quote_keeps_price_units() {
        let pair = Instrument::parse("EUR_USD");
        let margin = MarginModel::new(10.0, "usd");
        assert_eq!(units_available(&pair, &margin, 1000.0, 1.25).unwrap(), 8000.0);
        let p = position(0, Direction::Short, 1.25, 1.0);
        let delta = equity_delta(&pair, &margin, &p, 8000.0).unwrap();
        assert!((delta - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn forex_needs_settings() {
        let pair = Instrument::parse("GBP_JPY");
        let p = [position(0, Direction::Long, 150.0, 151.0)];
        let err = simulate_equity(&p, &pair, &EquitySettings::new(1000.0)).unwrap_err();
        assert!(matches!(err, SizingError::MissingForexSettings { .. }));
    }

    #[test]
    fn cross_pair_without_home_leg_is_unimplemented() {
        let pair = Instrument::parse("GBP_JPY");
        let margin = MarginModel::new(50.0, "USD");
        assert!(matches!(
            margin.validate_for(&pair),
            Err(SizingError::Unimplemented { .. })
        ));
        assert!(margin.validate_for(&Instrument::parse("SPY")).is_ok());
    }
}
