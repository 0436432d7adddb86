//! Synthetic bar series for tests, benches and examples.
//!
//! Deterministic: the same arguments always produce the same bars.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Bar, BarError, BarSeries};

/// Timestamp of the first synthetic bar (2020-01-01 00:00 UTC).
pub fn base_timestamp() -> DateTime<Utc> {
    Utc.timestamp_opt(1_577_836_800, 0)
        .single()
        .unwrap_or_default()
}

/// Daily bars from close prices.
///
/// open = previous close (or close on the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let base = base_timestamp();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// `n` daily closes following `mid + amplitude * sin(2π i / period)`.
pub fn sine_closes(n: usize, mid: f64, amplitude: f64, period: f64) -> Vec<f64> {
    (0..n)
        .map(|i| mid + amplitude * (std::f64::consts::TAU * i as f64 / period).sin())
        .collect()
}

/// Sine-wave daily series wrapped as a validated [`BarSeries`].
pub fn sine_wave_series(symbol: &str, n: usize) -> Result<BarSeries, BarError> {
    BarSeries::new(symbol, bars_from_closes(&sine_closes(n, 100.0, 10.0, 60.0)))
}
