//! Trading strategies for the bar-replay backtester.
//!
//! This crate provides:
//! - The `Strategy` contract driven by the simulator
//! - A fixed-capacity rolling price window
//! - The moving-average crossover strategy

pub mod ma_crossover;
pub mod traits;
pub mod window;

pub use ma_crossover::{MovingAverageCrossover, SignalDirection, SignalState};
pub use traits::Strategy;
pub use window::RollingWindow;
