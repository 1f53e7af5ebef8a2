//! Timeline alignment.
//!
//! Merges per-ticker bar series into combined bars on a common timeline.

use std::collections::BTreeMap;

use replay_core::{Bar, CombinedBar, Error, Result, Ticker, Timestamp};
use tracing::debug;

use crate::source::{DateRange, MarketDataSource};

/// Builder for a chronologically ordered timeline of combined bars.
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    /// Combined bars keyed by timestamp.
    steps: BTreeMap<Timestamp, CombinedBar>,
}

impl TimelineBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one ticker's bar at a timestamp.
    ///
    /// A second bar for the same ticker and timestamp replaces the first.
    pub fn add_bar(&mut self, ticker: &str, ts: Timestamp, bar: Bar) {
        let step = self
            .steps
            .entry(ts)
            .or_insert_with(|| CombinedBar::new(ts));
        if step.bars.insert(ticker.to_string(), bar).is_some() {
            debug!(ticker, %ts, "replaced duplicate bar");
        }
    }

    /// Add a whole series for one ticker. Input order does not matter.
    pub fn add_series<I>(&mut self, ticker: &str, series: I)
    where
        I: IntoIterator<Item = (Timestamp, Bar)>,
    {
        for (ts, bar) in series {
            self.add_bar(ticker, ts, bar);
        }
    }

    /// Combined bars for `tickers` within `range`, oldest first.
    ///
    /// Timestamps where none of the requested tickers has data are dropped.
    pub fn build(&self, tickers: &[Ticker], range: DateRange) -> Vec<CombinedBar> {
        self.steps
            .values()
            .filter(|step| range.contains(step.timestamp))
            .filter_map(|step| {
                let mut combined = CombinedBar::new(step.timestamp);
                for ticker in tickers {
                    if let Some(bar) = step.get(ticker) {
                        combined.insert(ticker.clone(), *bar);
                    }
                }
                (!combined.is_empty()).then_some(combined)
            })
            .collect()
    }

    /// Number of distinct timestamps seen.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

/// Market data source over series held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    builder: TimelineBuilder,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bar series for a ticker.
    pub fn insert_series<I>(&mut self, ticker: &str, series: I)
    where
        I: IntoIterator<Item = (Timestamp, Bar)>,
    {
        self.builder.add_series(ticker, series);
    }

    /// Builder-style [`insert_series`](Self::insert_series).
    pub fn with_series<I>(mut self, ticker: &str, series: I) -> Self
    where
        I: IntoIterator<Item = (Timestamp, Bar)>,
    {
        self.insert_series(ticker, series);
        self
    }
}

impl MarketDataSource for InMemorySource {
    fn timeline(&self, tickers: &[Ticker], range: DateRange) -> Result<Vec<CombinedBar>> {
        let timeline = self.builder.build(tickers, range);
        if timeline.is_empty() {
            return Err(Error::data(format!(
                "no bars for {tickers:?} between {} and {}",
                range.start, range.end
            )));
        }
        debug!(steps = timeline.len(), tickers = tickers.len(), "built timeline");
        Ok(timeline)
    }
}
