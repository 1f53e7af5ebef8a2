//! Read-only views of a finished run for reporting collaborators.

use std::collections::BTreeMap;

use replay_core::{Quantity, Snapshot, Ticker, Timestamp};
use serde::Serialize;

use crate::ledger::Ledger;

/// One held position valued at its last observed close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionValuation {
    pub ticker: Ticker,
    pub quantity: Quantity,
    /// Last close seen during the run (0 if never seen).
    pub last_close: f64,
    pub market_value: f64,
}

/// End-of-run account summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalSummary {
    pub initial_capital: f64,
    /// Positions in ticker order, including flat ones.
    pub positions: Vec<PositionValuation>,
    pub cash: f64,
    /// Cash plus position market value.
    pub total_value: f64,
    /// Total value minus initial capital.
    pub delta: f64,
}

impl FinalSummary {
    /// Summarize the ledger, valuing positions at `last_close`.
    pub fn from_ledger(ledger: &Ledger, last_close: &BTreeMap<Ticker, f64>) -> Self {
        let positions: Vec<PositionValuation> = ledger
            .positions()
            .iter()
            .map(|(ticker, &quantity)| {
                let last_close = last_close.get(ticker).copied().unwrap_or(0.0);
                PositionValuation {
                    ticker: ticker.clone(),
                    quantity,
                    last_close,
                    market_value: quantity as f64 * last_close,
                }
            })
            .collect();

        let invested: f64 = positions.iter().map(|p| p.market_value).sum();
        let total_value = ledger.cash() + invested;

        Self {
            initial_capital: ledger.initial_capital(),
            positions,
            cash: ledger.cash(),
            total_value,
            delta: total_value - ledger.initial_capital(),
        }
    }
}

/// Series view over recorded snapshots, for plotting.
#[derive(Debug, Clone, Copy)]
pub struct History<'a> {
    snapshots: &'a [Snapshot],
}

impl<'a> History<'a> {
    pub fn new(snapshots: &'a [Snapshot]) -> Self {
        Self { snapshots }
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.snapshots.iter().map(|s| s.timestamp).collect()
    }

    pub fn cash_series(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.cash).collect()
    }

    pub fn total_value_series(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.total_value).collect()
    }

    /// Quantity held of `ticker` at each step (0 where not held).
    pub fn position_series(&self, ticker: &str) -> Vec<Quantity> {
        self.snapshots.iter().map(|s| s.quantity(ticker)).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
