//! Error types for the bar-replay backtester.

use thiserror::Error;

use crate::types::{Quantity, Ticker};

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors surfaced to the caller of a run.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (bad parameters, malformed intent).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (empty or out-of-order timeline).
    #[error("Data error: {0}")]
    Data(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }
}

/// Reason an order was not applied to the ledger.
///
/// Rejections are non-fatal. The order is dropped and the run continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderRejection {
    #[error("insufficient cash to buy {ticker}: required {required}, available {available}")]
    InsufficientCash {
        ticker: Ticker,
        required: f64,
        available: f64,
    },

    #[error("insufficient shares of {ticker}: requested {requested}, held {held}")]
    InsufficientShares {
        ticker: Ticker,
        requested: Quantity,
        held: Quantity,
    },

    /// The ticker has no bar at the current timestamp.
    #[error("no price for {ticker} in the current bar")]
    MissingPrice { ticker: Ticker },

    /// Negative or non-finite execution price.
    #[error("invalid price {price} for {ticker}")]
    InvalidPrice { ticker: Ticker, price: f64 },

    /// Zero-share order.
    #[error("order for {ticker} has zero quantity")]
    ZeroQuantity { ticker: Ticker },

    /// The resulting position would not fit in a `Quantity`.
    #[error("position overflow for {ticker}: held {held}, adding {requested}")]
    PositionOverflow {
        ticker: Ticker,
        requested: Quantity,
        held: Quantity,
    },
}

impl OrderRejection {
    /// Short machine-friendly label for the rejection kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderRejection::InsufficientCash { .. } => "insufficient_cash",
            OrderRejection::InsufficientShares { .. } => "insufficient_shares",
            OrderRejection::MissingPrice { .. } => "missing_price",
            OrderRejection::InvalidPrice { .. } => "invalid_price",
            OrderRejection::ZeroQuantity { .. } => "zero_quantity",
            OrderRejection::PositionOverflow { .. } => "position_overflow",
        }
    }
}
