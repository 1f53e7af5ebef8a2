//! Moving-average crossover strategy.
//!
//! Each ticker runs an independent state machine over a rolling window of
//! closes. When the short MA moves above the long MA a BUY is emitted, when
//! it moves below a SELL is emitted. The last emitted direction suppresses
//! repeats while the condition persists. Equal MAs emit nothing and leave
//! the state unchanged.

use std::collections::BTreeMap;

use replay_core::{Action, CombinedBar, CrossoverConfig, OrderIntent, Result, Ticker};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::traits::Strategy;
use crate::window::RollingWindow;

/// Last direction emitted for a ticker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalDirection {
    #[default]
    None,
    Bullish,
    Bearish,
}

/// Per-ticker crossover state.
#[derive(Debug, Clone)]
pub struct SignalState {
    /// Last `long_window` closes.
    window: RollingWindow,
    /// Last emitted direction.
    last_signal: SignalDirection,
}

impl SignalState {
    pub fn new(long_window: usize) -> Self {
        Self {
            window: RollingWindow::new(long_window),
            last_signal: SignalDirection::None,
        }
    }

    /// Feed one close and return the action to emit, if any.
    pub fn update(&mut self, close: f64, short_window: usize) -> Option<Action> {
        self.window.push(close);

        if !self.window.is_full() {
            return None;
        }
        let (short_ma, long_ma) = self.moving_averages(short_window)?;

        if short_ma > long_ma && self.last_signal != SignalDirection::Bullish {
            self.last_signal = SignalDirection::Bullish;
            Some(Action::Buy)
        } else if short_ma < long_ma && self.last_signal != SignalDirection::Bearish {
            self.last_signal = SignalDirection::Bearish;
            Some(Action::Sell)
        } else {
            None
        }
    }

    /// Current (short, long) moving averages, once the window is full.
    pub fn moving_averages(&self, short_window: usize) -> Option<(f64, f64)> {
        if !self.window.is_full() {
            return None;
        }
        Some((self.window.mean_last(short_window)?, self.window.mean()?))
    }

    pub fn last_signal(&self) -> SignalDirection {
        self.last_signal
    }

    /// Number of closes observed, capped at the long window.
    pub fn observed(&self) -> usize {
        self.window.len()
    }
}

/// Dual moving-average crossover strategy.
#[derive(Debug, Clone)]
pub struct MovingAverageCrossover {
    config: CrossoverConfig,
    /// State per ticker.
    states: BTreeMap<Ticker, SignalState>,
}

impl MovingAverageCrossover {
    /// Create the strategy with one state machine per ticker.
    ///
    /// Invalid windows or quantity are a configuration error.
    pub fn new(config: CrossoverConfig, tickers: &[Ticker]) -> Result<Self> {
        config.validate()?;

        let states = tickers
            .iter()
            .map(|ticker| (ticker.clone(), SignalState::new(config.long_window)))
            .collect();

        Ok(Self { config, states })
    }

    pub fn config(&self) -> &CrossoverConfig {
        &self.config
    }

    /// State for a ticker, if it has one.
    pub fn state(&self, ticker: &str) -> Option<&SignalState> {
        self.states.get(ticker)
    }

    /// Last emitted direction for a ticker.
    pub fn last_signal(&self, ticker: &str) -> SignalDirection {
        self.states
            .get(ticker)
            .map(SignalState::last_signal)
            .unwrap_or_default()
    }
}

impl Strategy for MovingAverageCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn on_bar(&mut self, bar: &CombinedBar) -> Vec<OrderIntent> {
        let mut intents = Vec::new();

        for (ticker, ticker_bar) in &bar.bars {
            if !ticker_bar.close.is_finite() {
                trace!(%ticker, close = ticker_bar.close, "skipping non-finite close");
                continue;
            }

            // State exists only for tickers given at construction.
            let Some(state) = self.states.get_mut(ticker) else {
                trace!(%ticker, "no signal state, ignoring");
                continue;
            };

            if let Some(action) = state.update(ticker_bar.close, self.config.short_window) {
                debug!(%ticker, %action, ts = %bar.timestamp, "crossover signal");
                intents.push(OrderIntent {
                    ticker: ticker.clone(),
                    action,
                    quantity: self.config.quantity,
                });
            }
        }

        intents
    }
}
