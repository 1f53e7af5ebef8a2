//! Backtest simulator.
//!
//! Replays a timeline of combined bars through a strategy and applies the
//! resulting intents to a fresh ledger. Each step runs to completion before
//! the next: strategy call, intents in the order returned, then one snapshot.

use std::collections::{BTreeMap, BTreeSet};

use replay_core::{
    BacktestConfig, CombinedBar, Error, Execution, OrderIntent, OrderRejection, Result, Snapshot,
    Ticker, Timestamp,
};
use replay_feed::{DateRange, MarketDataSource};
use replay_strategy::Strategy;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::ledger::{is_valid_price, Ledger};
use crate::metrics::{MetricsCalculator, PerformanceMetrics};
use crate::report::{FinalSummary, History};

/// An intent the ledger refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedOrder {
    pub timestamp: Timestamp,
    pub intent: OrderIntent,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: OrderRejection,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &OrderRejection,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&reason.to_string())
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    ledger: Ledger,
    executions: Vec<Execution>,
    rejections: Vec<RejectedOrder>,
    /// Last close seen per ticker.
    last_close: BTreeMap<Ticker, f64>,
    periods_per_year: f64,
}

impl BacktestRun {
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Snapshot history, one per step.
    pub fn snapshots(&self) -> &[Snapshot] {
        self.ledger.snapshots()
    }

    pub fn history(&self) -> History<'_> {
        History::new(self.ledger.snapshots())
    }

    /// Executed orders in execution order.
    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn rejections(&self) -> &[RejectedOrder] {
        &self.rejections
    }

    pub fn last_close(&self) -> &BTreeMap<Ticker, f64> {
        &self.last_close
    }

    /// End-of-run summary valued at each ticker's last close.
    pub fn summary(&self) -> FinalSummary {
        FinalSummary::from_ledger(&self.ledger, &self.last_close)
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        MetricsCalculator::new(self.ledger.initial_capital(), self.periods_per_year).calculate(
            self.ledger.snapshots(),
            &self.executions,
            self.rejections.len(),
        )
    }

    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }
}

/// Backtest simulator.
///
/// Holds only configuration. Every run gets its own ledger, so one
/// simulator can drive any number of independent runs.
#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    config: BacktestConfig,
}

/// Mutable state of a run in progress.
struct RunState {
    ledger: Ledger,
    tickers: BTreeSet<Ticker>,
    executions: Vec<Execution>,
    rejections: Vec<RejectedOrder>,
    last_close: BTreeMap<Ticker, f64>,
    last_ts: Option<Timestamp>,
}

impl BacktestSimulator {
    /// Create a simulator. The configuration is validated here.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Fetch the configured tickers and date range from `source`, then run.
    pub fn run_from_source<S>(
        &self,
        strategy: &mut S,
        source: &dyn MarketDataSource,
    ) -> Result<BacktestRun>
    where
        S: Strategy + ?Sized,
    {
        let range = DateRange::new(self.config.start, self.config.end)?;
        let timeline = source.timeline(&self.config.tickers, range)?;
        self.run(strategy, timeline)
    }

    /// Replay `bars` through `strategy`.
    ///
    /// `bars` may be lazy but must be in strictly increasing timestamp order.
    /// An empty or out-of-order timeline is a data error; an invalid intent
    /// aborts the run with a configuration error. Ledger rejections are
    /// recorded and the run continues.
    pub fn run<S, I>(&self, strategy: &mut S, bars: I) -> Result<BacktestRun>
    where
        S: Strategy + ?Sized,
        I: IntoIterator<Item = CombinedBar>,
    {
        let mut state = RunState {
            ledger: Ledger::with_tickers(self.config.initial_capital, &self.config.tickers)?,
            tickers: self.config.tickers.iter().cloned().collect(),
            executions: Vec::new(),
            rejections: Vec::new(),
            last_close: BTreeMap::new(),
            last_ts: None,
        };

        info!(
            strategy = strategy.name(),
            tickers = state.tickers.len(),
            initial_capital = self.config.initial_capital,
            "starting backtest"
        );

        for bar in bars {
            state.step(strategy, bar)?;
        }

        if state.last_ts.is_none() {
            return Err(Error::data("timeline is empty, nothing to simulate"));
        }

        let run = BacktestRun {
            ledger: state.ledger,
            executions: state.executions,
            rejections: state.rejections,
            last_close: state.last_close,
            periods_per_year: self.config.periods_per_year,
        };

        info!(
            steps = run.snapshots().len(),
            executed = run.executions.len(),
            rejected = run.rejections.len(),
            total_value = run.snapshots().last().map_or(0.0, |s| s.total_value),
            "backtest completed"
        );

        Ok(run)
    }
}

impl RunState {
    fn step<S>(&mut self, strategy: &mut S, raw: CombinedBar) -> Result<()>
    where
        S: Strategy + ?Sized,
    {
        if let Some(prev) = self.last_ts {
            if raw.timestamp <= prev {
                return Err(Error::data(format!(
                    "timeline not strictly increasing: {} after {prev}",
                    raw.timestamp
                )));
            }
        }
        self.last_ts = Some(raw.timestamp);

        // Only the run's tickers are visible to the strategy.
        let mut bar = CombinedBar::new(raw.timestamp);
        for (ticker, ticker_bar) in raw.bars {
            if self.tickers.contains(&ticker) {
                // Unusable closes never replace the last good one.
                if is_valid_price(ticker_bar.close) {
                    self.last_close.insert(ticker.clone(), ticker_bar.close);
                }
                bar.insert(ticker, ticker_bar);
            }
        }
        trace!(ts = %bar.timestamp, tickers = bar.len(), "step");

        let intents = strategy.on_bar(&bar);

        // Sequential: earlier intents change what later ones can afford.
        for intent in intents {
            intent.validate()?;
            if !self.tickers.contains(&intent.ticker) {
                return Err(Error::config(format!(
                    "strategy emitted an order for {}, which is not in the run",
                    intent.ticker
                )));
            }

            let outcome = match bar.close(&intent.ticker) {
                Some(price) => self.ledger.apply(&intent, price).map(|()| price),
                None => Err(OrderRejection::MissingPrice {
                    ticker: intent.ticker.clone(),
                }),
            };

            match outcome {
                Ok(price) => {
                    debug!(
                        ts = %bar.timestamp,
                        ticker = %intent.ticker,
                        action = %intent.action,
                        quantity = intent.quantity,
                        price,
                        cash = self.ledger.cash(),
                        "order executed"
                    );
                    self.executions.push(Execution {
                        timestamp: bar.timestamp,
                        ticker: intent.ticker,
                        action: intent.action,
                        quantity: intent.quantity,
                        price,
                    });
                }
                Err(reason) => {
                    warn!(
                        ts = %bar.timestamp,
                        kind = reason.kind(),
                        "order rejected: {reason}"
                    );
                    self.rejections.push(RejectedOrder {
                        timestamp: bar.timestamp,
                        intent,
                        reason,
                    });
                }
            }
        }

        self.ledger.record_snapshot(bar.timestamp, &bar.closes())?;
        Ok(())
    }
}
