//! Core data types for the bar-replay backtester.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bar timestamp (UTC).
pub type Timestamp = DateTime<Utc>;

/// Ticker symbol.
pub type Ticker = String;

/// Share count. Positions are never negative.
pub type Quantity = u64;

/// One OHLCV observation for one ticker at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price. The only field used for execution and valuation.
    pub close: f64,
    /// Total volume.
    pub volume: f64,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A flat bar where every price equals `close`.
    pub fn from_close(close: f64) -> Self {
        Self::new(close, close, close, close, 0.0)
    }
}

/// All tickers' bars sharing one timestamp.
///
/// Tickers without data at this timestamp are absent from the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedBar {
    /// Shared timestamp.
    pub timestamp: Timestamp,
    /// Bars keyed by ticker, iterated in ticker order.
    pub bars: BTreeMap<Ticker, Bar>,
}

impl CombinedBar {
    /// Create an empty combined bar.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            bars: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_bar(mut self, ticker: impl Into<Ticker>, bar: Bar) -> Self {
        self.insert(ticker, bar);
        self
    }

    /// Insert or replace a ticker's bar.
    pub fn insert(&mut self, ticker: impl Into<Ticker>, bar: Bar) {
        self.bars.insert(ticker.into(), bar);
    }

    /// Bar for a ticker, if present at this timestamp.
    pub fn get(&self, ticker: &str) -> Option<&Bar> {
        self.bars.get(ticker)
    }

    /// Close for a ticker, if present at this timestamp.
    #[inline]
    pub fn close(&self, ticker: &str) -> Option<f64> {
        self.bars.get(ticker).map(|bar| bar.close)
    }

    /// Closing prices of every ticker present.
    pub fn closes(&self) -> BTreeMap<Ticker, f64> {
        self.bars
            .iter()
            .map(|(ticker, bar)| (ticker.clone(), bar.close))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }

    /// Cash sign: buying spends cash, selling receives it.
    pub fn cash_sign(self) -> f64 {
        match self {
            Action::Buy => -1.0,
            Action::Sell => 1.0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            other => Err(Error::config(format!("unknown order action '{other}'"))),
        }
    }
}

/// A strategy's request to buy or sell. Carries no price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub ticker: Ticker,
    pub action: Action,
    pub quantity: Quantity,
}

/// Untyped wire shape, validated into an [`OrderIntent`].
#[derive(Deserialize)]
struct RawIntent {
    ticker: String,
    action: String,
    quantity: i64,
}

impl OrderIntent {
    /// Create a validated intent.
    pub fn new(ticker: impl Into<Ticker>, action: Action, quantity: Quantity) -> Result<Self> {
        let intent = Self {
            ticker: ticker.into(),
            action,
            quantity,
        };
        intent.validate()?;
        Ok(intent)
    }

    pub fn buy(ticker: impl Into<Ticker>, quantity: Quantity) -> Result<Self> {
        Self::new(ticker, Action::Buy, quantity)
    }

    pub fn sell(ticker: impl Into<Ticker>, quantity: Quantity) -> Result<Self> {
        Self::new(ticker, Action::Sell, quantity)
    }

    /// Check the intent is well formed.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.is_empty() {
            return Err(Error::config("order intent has an empty ticker"));
        }
        if self.quantity == 0 {
            return Err(Error::config(format!(
                "order intent for {} has non-positive quantity",
                self.ticker
            )));
        }
        Ok(())
    }

    /// Parse `{"ticker": .., "action": "BUY"|"SELL", "quantity": n}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawIntent = serde_json::from_str(json)?;
        let action = raw.action.parse::<Action>()?;
        let quantity = Quantity::try_from(raw.quantity).map_err(|_| {
            Error::config(format!(
                "order intent for {} has non-positive quantity {}",
                raw.ticker, raw.quantity
            ))
        })?;
        Self::new(raw.ticker, action, quantity)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// An order that was applied to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Step timestamp.
    pub timestamp: Timestamp,
    pub ticker: Ticker,
    pub action: Action,
    pub quantity: Quantity,
    /// Execution price (the step's close).
    pub price: f64,
}

impl Execution {
    /// Price times quantity.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// Cash change caused by this execution.
    #[inline]
    pub fn cash_flow(&self) -> f64 {
        self.action.cash_sign() * self.notional()
    }
}

/// Point-in-time record of ledger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub cash: f64,
    /// Share count per ticker.
    pub positions: BTreeMap<Ticker, Quantity>,
    /// Cash plus positions valued at the step's closes.
    pub total_value: f64,
}

impl Snapshot {
    /// Quantity held of a ticker (0 if never held).
    pub fn quantity(&self, ticker: &str) -> Quantity {
        self.positions.get(ticker).copied().unwrap_or(0)
    }

    /// Value held in positions.
    pub fn positions_value(&self) -> f64 {
        self.total_value - self.cash
    }
}
