//! Core types and configuration for the bar-replay backtester.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (bars, combined bars)
//! - Order intents, executions and ledger snapshots
//! - Configuration structures
//! - Common error and rejection types

pub mod config;
pub mod error;
pub mod types;

pub use config::{BacktestConfig, Config, CrossoverConfig};
pub use error::{Error, OrderRejection, Result};
pub use types::*;
