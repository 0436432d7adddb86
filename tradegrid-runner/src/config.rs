//! Optimizer settings, loaded from TOML.
//!
//! ```toml
//! [optimizer]
//! start_date = "2015-01-01T00:00:00Z"
//! parallel = true
//!
//! [instrument]
//! symbol = "EUR_USD"
//!
//! [[periods]]
//! name = "short"
//! range = "5, 50, 5"
//!
//! [[periods]]
//! name = "long"
//! range = [20, 200, 10]
//!
//! [portfolio]
//! initial_equity = 10000.0
//! margin_ratio = 20.0
//! home_currency = "USD"
//! stop_loss = 50
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradegrid_core::domain::Instrument;
use tradegrid_core::engine::{EquitySettings, ExitRules, MarginModel, SizingError};

use crate::grid::{GridError, ParameterGrid, RangeSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse optimizer TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("period \"{name}\": {source}")]
    InvalidRange { name: String, source: GridError },
}

/// Portfolio settings shared by every unit of a sweep.
///
/// Equity is only simulated when `initial_equity` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSettings {
    pub initial_equity: Option<f64>,
    pub margin_ratio: Option<f64>,
    pub home_currency: Option<String>,
    pub top_off: bool,
    /// Stop-loss distance in pips.
    pub stop_loss: Option<u32>,
    /// Take-profit distance in pips.
    pub take_profit: Option<u32>,
}

impl PortfolioSettings {
    pub fn with_initial_equity(mut self, equity: f64) -> Self {
        self.initial_equity = Some(equity);
        self
    }

    pub fn with_margin(mut self, ratio: f64, home_currency: impl Into<String>) -> Self {
        self.margin_ratio = Some(ratio);
        self.home_currency = Some(home_currency.into());
        self
    }

    pub fn with_top_off(mut self, top_off: bool) -> Self {
        self.top_off = top_off;
        self
    }

    pub fn with_stop_loss(mut self, pips: u32) -> Self {
        self.stop_loss = Some(pips);
        self
    }

    pub fn with_take_profit(mut self, pips: u32) -> Self {
        self.take_profit = Some(pips);
        self
    }

    pub fn exit_rules(&self, instrument: &Instrument) -> ExitRules {
        ExitRules {
            pip_size: instrument.pip_size,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
        }
    }

    pub fn margin(&self) -> MarginModel {
        MarginModel {
            margin_ratio: self.margin_ratio,
            home_currency: self.home_currency.clone(),
        }
    }

    /// `None` when equity simulation is disabled.
    pub fn equity_settings(&self) -> Option<EquitySettings> {
        self.initial_equity.map(|equity| {
            EquitySettings::new(equity)
                .with_top_off(self.top_off)
                .with_margin(self.margin())
        })
    }

    /// Fail early if equity cannot be simulated for `instrument`.
    pub fn validate_for(&self, instrument: &Instrument) -> Result<(), SizingError> {
        match self.equity_settings() {
            Some(settings) => settings.margin.validate_for(instrument),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSection {
    /// Bars before this instant are dropped before the sweep starts.
    pub start_date: Option<DateTime<Utc>>,
    pub parallel: bool,
    /// Keep only strictly increasing period tuples.
    pub increasing_only: bool,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            start_date: None,
            parallel: true,
            increasing_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSection {
    pub symbol: String,
    /// Overrides the pip size derived from the symbol.
    pub pip_size: Option<f64>,
}

/// A range as written in TOML: a `"start, stop, step"` string or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeInput {
    Text(String),
    Triple(Vec<i64>),
}

impl RangeInput {
    fn to_spec(&self) -> Result<RangeSpec, GridError> {
        match self {
            Self::Text(text) => text.parse(),
            Self::Triple(values) => RangeSpec::try_from(values.as_slice()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub name: String,
    pub range: RangeInput,
}

/// Complete optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub optimizer: OptimizerSection,
    pub instrument: InstrumentSection,
    pub periods: Vec<PeriodRange>,
    #[serde(default)]
    pub portfolio: PortfolioSettings,
}

impl OptimizerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.grid()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn instrument(&self) -> Instrument {
        let instrument = Instrument::parse(&self.instrument.symbol);
        match self.instrument.pip_size {
            Some(pip) => instrument.with_pip_size(pip),
            None => instrument,
        }
    }

    /// The sweep grid, in `[[periods]]` order.
    pub fn grid(&self) -> Result<ParameterGrid, ConfigError> {
        let ranges = self
            .periods
            .iter()
            .map(|p| {
                p.range.to_spec().map_err(|source| ConfigError::InvalidRange {
                    name: p.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(if self.optimizer.increasing_only {
            ParameterGrid::new(ranges)
        } else {
            ParameterGrid::unfiltered(ranges)
        })
    }
}
