use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account equity right after a position closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Equity trajectory across a position list.
///
/// `points[0]` is the starting equity stamped at the first position's open
/// time; `points[i + 1]` is the equity after position `i` closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
    /// Capital injected by top-offs, kept apart from trading profit.
    pub added_equity: f64,
}

impl EquityCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    /// Equity after the position at `index` closed.
    pub fn for_position(&self, index: usize) -> Option<&EquityPoint> {
        self.points.get(index + 1)
    }
}
