//! Configuration structures for the bar-replay backtester.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Quantity, Ticker};

/// Main configuration for a backtest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run configuration.
    pub backtest: BacktestConfig,
    /// Moving-average crossover parameters.
    pub strategy: CrossoverConfig,
}

impl Config {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.backtest.validate()?;
        self.strategy.validate()
    }
}

/// Backtest run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Initial cash endowment.
    pub initial_capital: f64,
    /// Tickers traded in the run.
    pub tickers: Vec<Ticker>,
    /// First date of the replay (inclusive).
    pub start: NaiveDate,
    /// Last date of the replay (inclusive).
    pub end: NaiveDate,
    /// Steps per year, used to annualize ratios (252 for daily bars).
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10000.0,
            tickers: Vec::new(),
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
            periods_per_year: 252.0,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.initial_capital.is_finite() || self.initial_capital < 0.0 {
            return Err(Error::config(format!(
                "initial_capital must be a non-negative number, got {}",
                self.initial_capital
            )));
        }
        if self.tickers.is_empty() {
            return Err(Error::config("at least one ticker is required"));
        }
        if self.tickers.iter().any(|t| t.is_empty()) {
            return Err(Error::config("ticker symbols must not be empty"));
        }
        if self.start > self.end {
            return Err(Error::config(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if self.periods_per_year.is_nan() || self.periods_per_year <= 0.0 {
            return Err(Error::config("periods_per_year must be positive"));
        }
        Ok(())
    }
}

/// Moving-average crossover parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverConfig {
    /// Bars in the short moving average.
    pub short_window: usize,
    /// Bars in the long moving average.
    pub long_window: usize,
    /// Shares per emitted order.
    pub quantity: Quantity,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 20,
            quantity: 5,
        }
    }
}

impl CrossoverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.short_window == 0 {
            return Err(Error::config("short_window must be positive"));
        }
        if self.short_window >= self.long_window {
            return Err(Error::config(format!(
                "short_window ({}) must be less than long_window ({})",
                self.short_window, self.long_window
            )));
        }
        if self.quantity == 0 {
            return Err(Error::config("quantity must be positive"));
        }
        Ok(())
    }
}
