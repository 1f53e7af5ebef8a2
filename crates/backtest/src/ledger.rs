//! Cash and position ledger.
//!
//! The ledger is the only place account state changes. Orders that would
//! drive cash or a position negative are rejected, never clamped.

use std::collections::BTreeMap;

use replay_core::{
    Action, Error, OrderIntent, OrderRejection, Quantity, Result, Snapshot, Ticker, Timestamp,
};

/// Outcome of a ledger operation.
pub type OrderResult = std::result::Result<(), OrderRejection>;

/// Account state for one backtest run.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Starting cash.
    initial_capital: f64,
    /// Current cash. Never negative.
    cash: f64,
    /// Shares held per ticker.
    positions: BTreeMap<Ticker, Quantity>,
    /// Append-only history, one per simulated step.
    snapshots: Vec<Snapshot>,
}

impl Ledger {
    /// Create a ledger with an initial cash endowment and no positions.
    pub fn new(initial_capital: f64) -> Result<Self> {
        if !initial_capital.is_finite() || initial_capital < 0.0 {
            return Err(Error::config(format!(
                "initial capital must be a non-negative number, got {initial_capital}"
            )));
        }
        Ok(Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            snapshots: Vec::new(),
        })
    }

    /// Create a ledger with a zero position for each ticker, so snapshots
    /// report every traded ticker from the first step.
    pub fn with_tickers(initial_capital: f64, tickers: &[Ticker]) -> Result<Self> {
        let mut ledger = Self::new(initial_capital)?;
        for ticker in tickers {
            ledger.positions.insert(ticker.clone(), 0);
        }
        Ok(ledger)
    }

    /// Buy `quantity` shares at `price`.
    ///
    /// Succeeds iff `price * quantity <= cash`.
    pub fn buy(&mut self, ticker: &str, quantity: Quantity, price: f64) -> OrderResult {
        check_order(ticker, quantity, price)?;

        let cost = price * quantity as f64;
        if cost > self.cash {
            return Err(OrderRejection::InsufficientCash {
                ticker: ticker.to_string(),
                required: cost,
                available: self.cash,
            });
        }

        let held = self.position(ticker);
        let Some(updated) = held.checked_add(quantity) else {
            return Err(OrderRejection::PositionOverflow {
                ticker: ticker.to_string(),
                requested: quantity,
                held,
            });
        };

        self.cash -= cost;
        self.positions.insert(ticker.to_string(), updated);
        Ok(())
    }

    /// Sell `quantity` shares at `price`.
    ///
    /// Succeeds iff at least `quantity` shares are held.
    pub fn sell(&mut self, ticker: &str, quantity: Quantity, price: f64) -> OrderResult {
        check_order(ticker, quantity, price)?;

        let held = self.position(ticker);
        if held < quantity {
            return Err(OrderRejection::InsufficientShares {
                ticker: ticker.to_string(),
                requested: quantity,
                held,
            });
        }

        self.positions.insert(ticker.to_string(), held - quantity);
        self.cash += price * quantity as f64;
        Ok(())
    }

    /// Apply an intent at the given execution price.
    pub fn apply(&mut self, intent: &OrderIntent, price: f64) -> OrderResult {
        match intent.action {
            Action::Buy => self.buy(&intent.ticker, intent.quantity, price),
            Action::Sell => self.sell(&intent.ticker, intent.quantity, price),
        }
    }

    /// Cash plus every position valued at `prices`.
    ///
    /// A ticker with no usable price (missing, negative or non-finite)
    /// contributes zero.
    pub fn total_value(&self, prices: &BTreeMap<Ticker, f64>) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .filter_map(|(ticker, &qty)| {
                    let price = prices.get(ticker).copied().filter(|&p| is_valid_price(p))?;
                    Some(qty as f64 * price)
                })
                .sum::<f64>()
    }

    /// Record the current state valued at `prices`.
    ///
    /// Timestamps must strictly increase.
    pub fn record_snapshot(
        &mut self,
        timestamp: Timestamp,
        prices: &BTreeMap<Ticker, f64>,
    ) -> Result<&Snapshot> {
        if let Some(last) = self.snapshots.last() {
            if timestamp <= last.timestamp {
                return Err(Error::data(format!(
                    "snapshot at {timestamp} does not follow {}",
                    last.timestamp
                )));
            }
        }

        self.snapshots.push(Snapshot {
            timestamp,
            cash: self.cash,
            positions: self.positions.clone(),
            total_value: self.total_value(prices),
        });
        Ok(&self.snapshots[self.snapshots.len() - 1])
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Shares held of a ticker (0 if never traded).
    pub fn position(&self, ticker: &str) -> Quantity {
        self.positions.get(ticker).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &BTreeMap<Ticker, Quantity> {
        &self.positions
    }

    /// Recorded history, oldest first.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

/// Finite and non-negative.
pub(crate) fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}

fn check_order(ticker: &str, quantity: Quantity, price: f64) -> OrderResult {
    if quantity == 0 {
        return Err(OrderRejection::ZeroQuantity {
            ticker: ticker.to_string(),
        });
    }
    if !is_valid_price(price) {
        return Err(OrderRejection::InvalidPrice {
            ticker: ticker.to_string(),
            price,
        });
    }
    Ok(())
}
