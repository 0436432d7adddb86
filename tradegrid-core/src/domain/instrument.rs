use serde::{Deserialize, Serialize};

/// What kind of market an instrument trades in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// A currency pair such as `EUR_USD` (base `EUR`, quote `USD`).
    CurrencyPair { base: String, quote: String },
    /// Anything else: equities, indices, macro series.
    Other,
}

/// Instrument metadata needed for pricing stops and sizing trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Smallest quoted price increment; stop/take distances are in these units.
    pub pip_size: f64,
    pub kind: InstrumentKind,
}

impl Instrument {
    /// Classify a symbol and pick its default pip size.
    ///
    /// Symbols shaped `XXX_YYY` (seven characters, underscore at index 3) are
    /// currency pairs. JPY-quoted USD trades in 0.01 pips, other pairs in
    /// 0.0001; everything else defaults to 0.01.
    pub fn parse(symbol: &str) -> Self {
        let kind = match split_pair(symbol) {
            Some((base, quote)) => InstrumentKind::CurrencyPair { base, quote },
            None => InstrumentKind::Other,
        };
        let pip_size = match &kind {
            InstrumentKind::CurrencyPair { .. } if symbol == "USD_JPY" => 0.01,
            InstrumentKind::CurrencyPair { .. } => 0.0001,
            InstrumentKind::Other => 0.01,
        };
        Self {
            symbol: symbol.to_string(),
            pip_size,
            kind,
        }
    }

    pub fn with_pip_size(mut self, pip_size: f64) -> Self {
        self.pip_size = pip_size;
        self
    }

    pub fn is_currency_pair(&self) -> bool {
        matches!(self.kind, InstrumentKind::CurrencyPair { .. })
    }

    /// `(base, quote)` for currency pairs.
    pub fn currencies(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InstrumentKind::CurrencyPair { base, quote } => Some((base, quote)),
            InstrumentKind::Other => None,
        }
    }
}

fn split_pair(symbol: &str) -> Option<(String, String)> {
    if !symbol.is_ascii() || symbol.len() != 7 || symbol.as_bytes()[3] != b'_' {
        return None;
    }
    let (base, quote) = (&symbol[..3], &symbol[4..]);
    if base.contains('_') || quote.contains('_') {
        return None;
    }
    Some((base.to_uppercase(), quote.to_uppercase()))
}
