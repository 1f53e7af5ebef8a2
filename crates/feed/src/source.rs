//! Market data source contract.

use chrono::NaiveDate;
use replay_core::{CombinedBar, Error, Result, Ticker, Timestamp};
use serde::{Deserialize, Serialize};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range. `start` after `end` is a configuration error.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::config(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Range covering every representable date.
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    /// Whether the timestamp's UTC date falls inside the range.
    #[inline]
    pub fn contains(&self, ts: Timestamp) -> bool {
        let date = ts.date_naive();
        self.start <= date && date <= self.end
    }
}

/// Supplies historical bars for the simulator.
///
/// Implementations must return combined bars ordered by strictly increasing
/// timestamp. Individual tickers may be missing from a combined bar; the
/// overall timeline is never synthesized.
pub trait MarketDataSource {
    /// Fetch the timeline for `tickers` within `range`.
    ///
    /// Returns `Error::Data` when no bars are available.
    fn timeline(&self, tickers: &[Ticker], range: DateRange) -> Result<Vec<CombinedBar>>;
}
