//! Backtesting engine for the bar-replay system.
//!
//! This crate provides:
//! - The cash/position ledger and its snapshot history
//! - The bar-by-bar simulation loop
//! - End-of-run summaries and history series
//! - Performance metrics over the equity curve

pub mod ledger;
pub mod metrics;
pub mod report;
pub mod simulator;

pub use ledger::{Ledger, OrderResult};
pub use metrics::{EquityPoint, MetricsCalculator, PerformanceMetrics};
pub use report::{FinalSummary, History, PositionValuation};
pub use simulator::{BacktestRun, BacktestSimulator, RejectedOrder};
