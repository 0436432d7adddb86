//! Position: one closed, round-trip trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// `+1.0` for long, `-1.0` for short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = i8;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Long),
            -1 => Ok(Self::Short),
            other => Err(other),
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// The signal run ended naturally.
    Signal,
    StopLoss,
    TakeProfit,
}

/// A closed trade built from one signal run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open_price: f64,
    pub close_price: f64,
    pub direction: Direction,
    pub bars_held: usize,
    /// Realized profit in price units, positive when the trade made money.
    pub profit: f64,
    /// Maximum favorable excursion in price units.
    pub favorable: f64,
    /// Maximum adverse excursion in price units.
    pub adverse: f64,
    pub close_reason: CloseReason,
}

impl Position {
    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }
}
