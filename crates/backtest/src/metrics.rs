//! Backtest performance metrics.
//!
//! Calculates performance metrics from the snapshot equity curve.

use replay_core::{Action, Execution, Snapshot, Timestamp};
use serde::Serialize;

/// Backtest performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Number of simulated steps.
    pub steps: usize,
    /// Executed buy orders.
    pub buys: u32,
    /// Executed sell orders.
    pub sells: u32,
    /// Orders rejected by the ledger.
    pub rejected: u32,
    /// Final total value minus initial capital.
    pub net_pnl: f64,
    /// Total return percentage.
    pub total_return_pct: f64,
    /// Maximum drawdown (absolute).
    pub max_drawdown: f64,
    /// Maximum drawdown percentage.
    pub max_drawdown_pct: f64,
    /// Sharpe ratio (annualized over per-step returns).
    pub sharpe_ratio: f64,
    /// Sortino ratio.
    pub sortino_ratio: f64,
}

/// Equity curve point.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: Timestamp,
    pub equity: f64,
    pub drawdown: f64,
    pub drawdown_pct: f64,
}

/// Metrics calculator.
pub struct MetricsCalculator {
    initial_capital: f64,
    periods_per_year: f64,
}

impl MetricsCalculator {
    /// Create a new metrics calculator.
    pub fn new(initial_capital: f64, periods_per_year: f64) -> Self {
        Self {
            initial_capital,
            periods_per_year,
        }
    }

    /// Calculate metrics from a run's history.
    pub fn calculate(
        &self,
        snapshots: &[Snapshot],
        executions: &[Execution],
        rejected: usize,
    ) -> PerformanceMetrics {
        let mut metrics = PerformanceMetrics {
            steps: snapshots.len(),
            rejected: rejected as u32,
            ..Default::default()
        };

        for execution in executions {
            match execution.action {
                Action::Buy => metrics.buys += 1,
                Action::Sell => metrics.sells += 1,
            }
        }

        let Some(last) = snapshots.last() else {
            return metrics;
        };

        metrics.net_pnl = last.total_value - self.initial_capital;
        metrics.total_return_pct = if self.initial_capital > 0.0 {
            (metrics.net_pnl / self.initial_capital) * 100.0
        } else {
            0.0
        };

        for point in self.build_equity_curve(snapshots) {
            if point.drawdown > metrics.max_drawdown {
                metrics.max_drawdown = point.drawdown;
                metrics.max_drawdown_pct = point.drawdown_pct;
            }
        }

        let returns = self.step_returns(snapshots);
        metrics.sharpe_ratio = self.calculate_sharpe(&returns);
        metrics.sortino_ratio = self.calculate_sortino(&returns);

        metrics
    }

    /// Build the equity curve with running drawdown.
    ///
    /// The peak starts at the initial capital.
    pub fn build_equity_curve(&self, snapshots: &[Snapshot]) -> Vec<EquityPoint> {
        let mut peak = self.initial_capital;

        snapshots
            .iter()
            .map(|snapshot| {
                let equity = snapshot.total_value;
                peak = peak.max(equity);

                let drawdown = peak - equity;
                let drawdown_pct = if peak > 0.0 {
                    (drawdown / peak) * 100.0
                } else {
                    0.0
                };

                EquityPoint {
                    timestamp: snapshot.timestamp,
                    equity,
                    drawdown,
                    drawdown_pct,
                }
            })
            .collect()
    }

    /// Simple returns between consecutive steps, starting from initial capital.
    fn step_returns(&self, snapshots: &[Snapshot]) -> Vec<f64> {
        let mut prev = self.initial_capital;
        let mut returns = Vec::with_capacity(snapshots.len());

        for snapshot in snapshots {
            if prev > 0.0 {
                returns.push((snapshot.total_value - prev) / prev);
            }
            prev = snapshot.total_value;
        }

        returns
    }

    /// Calculate Sharpe ratio from returns.
    fn calculate_sharpe(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev > 0.0 {
            (mean / std_dev) * self.periods_per_year.sqrt()
        } else {
            0.0
        }
    }

    /// Calculate Sortino ratio from returns.
    fn calculate_sortino(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;

        // Downside deviation (only negative returns)
        let downside_variance = returns
            .iter()
            .filter(|&&r| r < 0.0)
            .map(|r| r.powi(2))
            .sum::<f64>()
            / n;
        let downside_dev = downside_variance.sqrt();

        if downside_dev > 0.0 {
            (mean / downside_dev) * self.periods_per_year.sqrt()
        } else if mean > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }
}
