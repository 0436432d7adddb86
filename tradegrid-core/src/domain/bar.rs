//! Bar and BarSeries: the input market data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV sample for one fixed time interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// OHLC ordering check: high bounds everything, low is bounded by everything.
    pub fn is_consistent(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BarError {
    #[error("bar {index} at {current} is not after the previous bar at {previous}")]
    NotAscending {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("bar {index} at {timestamp} violates OHLC ordering")]
    Inconsistent {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("market data unavailable: {0}")]
    Unavailable(String),
}

/// Immutable, timestamp-ordered bar series for one instrument.
///
/// Cloning is cheap: the bars live behind an `Arc` and slicing by date only
/// moves the view offset, so every optimizer worker can hold its own handle
/// to the same data.
#[derive(Debug, Clone)]
pub struct BarSeries {
    symbol: String,
    bars: Arc<[Bar]>,
    offset: usize,
}

impl BarSeries {
    /// Validate and wrap bars. Timestamps must be strictly ascending; bars
    /// with defined prices must respect OHLC ordering. Void bars are kept,
    /// downstream stages treat their prices as undefined.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(BarError::NotAscending {
                    index: index + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        if let Some((index, bar)) = bars
            .iter()
            .enumerate()
            .find(|(_, b)| !b.is_void() && !b.is_consistent())
        {
            return Err(BarError::Inconsistent {
                index,
                timestamp: bar.timestamp,
            });
        }

        Ok(Self {
            symbol: symbol.into(),
            bars: bars.into(),
            offset: 0,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars[self.offset..]
    }

    pub fn len(&self) -> usize {
        self.bars().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars().is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars().first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars().last().map(|b| b.timestamp)
    }

    /// View of the bars at or after `cutoff`. Shares storage with `self`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> BarSeries {
        let skip = self.bars().partition_point(|b| b.timestamp < cutoff);
        Self {
            symbol: self.symbol.clone(),
            bars: Arc::clone(&self.bars),
            offset: self.offset + skip,
        }
    }
}

/// Source of an ordered bar series.
///
/// Download, caching and file formats live behind this trait; the engine
/// only ever reads the series it returns.
pub trait MarketDataSource: Send + Sync {
    fn load(&self) -> Result<BarSeries, BarError>;
}

impl MarketDataSource for BarSeries {
    fn load(&self) -> Result<BarSeries, BarError> {
        Ok(self.clone())
    }
}
