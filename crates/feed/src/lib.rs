//! Market data plumbing for the bar-replay backtester.
//!
//! This crate handles:
//! - The `MarketDataSource` contract consumed by the simulator
//! - Inclusive date ranges
//! - Aligning per-ticker bar series onto one common timeline

pub mod source;
pub mod timeline;

pub use source::{DateRange, MarketDataSource};
pub use timeline::{InMemorySource, TimelineBuilder};
