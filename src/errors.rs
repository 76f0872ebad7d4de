/// Result type of the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors of the crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The candle data provided is empty. A feed requires at least one candle.
    #[error("Candle data is empty: a feed requires at least one candle")]
    CandleDataEmpty,

    /// A candle builder was finalized without a required field.
    #[error("Missing candle field: {0}")]
    MissingField(&'static str),

    /// The OHLC values of a candle are not consistent (e.g. high below low).
    #[error("Invalid candle: open {open}, high {high}, low {low}, close {close}")]
    InvalidCandle {
        /// Opening price.
        open: f64,
        /// Highest price.
        high: f64,
        /// Lowest price.
        low: f64,
        /// Closing price.
        close: f64,
    },

    /// The starting cash is not positive.
    #[error("Balance must be positive (got: {0})")]
    NegZeroBalance(f64),

    /// The order size is not a positive finite number.
    #[error("Order size must be positive (got: {0})")]
    InvalidSize(f64),

    /// A reference price (limit or trigger) is not a positive finite number.
    #[error("Order price must be positive (got: {0})")]
    InvalidPrice(f64),

    /// The contract multiplier is not positive.
    #[error("Multiplier must be positive (got: {0})")]
    InvalidMultiplier(f64),

    /// The margin per unit is not positive.
    #[error("Margin must be positive (got: {0})")]
    InvalidMargin(f64),

    /// The commission rate is negative or not finite.
    #[error("Commission must be a non-negative finite number (got: {0})")]
    NegCommission(f64),

    /// The backtest has no feed to iterate over.
    #[error("No feed added to the backtest")]
    NoFeeds,

    /// A feed does not have the same number of candles as the others.
    #[error("Feed {name} has {got} candles, expected {expected}")]
    FeedLengthMismatch {
        /// Name of the offending feed.
        name: String,
        /// Candles in the offending feed.
        got: usize,
        /// Candles in the feeds already added.
        expected: usize,
    },

    /// I/O error occurred.
    // utils.rs
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
