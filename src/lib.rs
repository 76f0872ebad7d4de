//! # BTS Broker: bar-by-bar order matching for backtests
//!
//! **BTS Broker** simulates the execution of orders against a sequence of OHLC bars for a single account.
//! Bar after bar it decides whether and at what price every pending order fills, and keeps cash,
//! positions, commission, and margin consistent with those fills.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`Candle`** | OHLCV (Open, High, Low, Close, Volume) data of one bar, with its timestamp.                   |
//! | **`CommissionScheme`** | Commission, margin, and multiplier of an instrument.                               |
//! | **`Order`**  | Trading intent with its execution type and lifecycle status.                                  |
//! | **`Position`** | Net holding and average entry price of an instrument.                                       |
//! | **`Wallet`** | Cash, commission paid, and settled mark-to-market.                                            |
//! | **`Broker`** | Matches pending orders against each bar and keeps the books.                                  |
//! | **`Backtest`** | Feeds named candle series to the broker and calls the strategy after each bar.             |
//!
//! ## Order Types
//! | Execution Type | Fill price                                                                                   |
//! |----------------|----------------------------------------------------------------------------------------------|
//! | **Market**     | Open of the next bar.                                                                        |
//! | **Close**      | Close of the bar the order was placed on, once a new bar starts.                             |
//! | **Limit**      | The limit or better: the open when the bar gaps through it.                                  |
//! | **Stop**       | The trigger once touched, or the open when the bar gaps through it.                          |
//! | **StopLimit**  | Armed at the trigger, then a limit order. The arming survives across bars.                   |
//!
//! Fills are always total. Orders without a validity never expire; the others expire on the first
//! bar strictly after their validity.
//!
//! ## Margined Instruments
//! Instruments with a margin (futures) reserve `margin * |size|` of cash while the position is open
//! and settle the price move into cash at every bar (mark-to-market). Instruments without a margin
//! (stocks) pay or receive the full notional.
//!
//! ## Getting Started
//! ```rust
//! use std::sync::Arc;
//!
//! use bts_broker::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let candles = [100.0, 102.0, 101.0, 105.0]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &close)| {
//!         CandleBuilder::builder()
//!             .open(close - 1.0)
//!             .high(close + 1.0)
//!             .low(close - 2.0)
//!             .close(close)
//!             .datetime(DateTime::default() + Duration::days(i as i64))
//!             .build()
//!             .unwrap()
//!     })
//!     .collect::<Vec<_>>();
//!
//! let mut bts = Backtest::new(BrokerConfig::default()).unwrap();
//! bts.add_feed("AAPL", Arc::from_iter(candles)).unwrap();
//!
//! bts.run(|broker| {
//!     for order in broker.drain_notifications() {
//!         println!("{:?} {} @ {}", order.status(), order.size(), order.executed().price);
//!     }
//!     if broker.orders().next().is_none() {
//!         broker.buy("me", "AAPL", 10.0, Some(ExecType::Limit(100.5)), None)?;
//!     }
//!     Ok(())
//! })
//! .unwrap();
//!
//! // the second bar opens at 101 and trades down to 100: filled at the limit
//! assert_eq!(bts.position("AAPL").price(), 100.5);
//! assert_eq!(bts.cash(), 10_000.0 - 1_005.0);
//! assert_eq!(bts.value(None), 10_000.0 - 1_005.0 + 1_050.0);
//! ```
//!
//! ## Integrations
//! | Crate          | Purpose                                                                                     |
//! |----------------|---------------------------------------------------------------------------------------------|
//! | [`log`](https://crates.io/crates/log) | Order lifecycle events, plug any logger implementation.                              |
//! | [`serde`](https://crates.io/crates/serde) | Serialize/deserialize orders and configs, load candle files (`serde` feature).   |
//!
//! ## Error Handling
//! Invalid inputs are rejected eagerly with an [`errors::Error`]:
//! - Non-positive starting cash, sizes, or prices.
//! - Inconsistent candles.
//! - Missing or mismatched feeds.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Core components: candles, orders, positions, wallet, broker, and backtest driver.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Candle file loaders.
#[cfg(feature = "serde")]
pub mod utils;

/// Re-exports of commonly used types for convenience.
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::errors::*;

    #[cfg(feature = "serde")]
    pub use crate::utils::*;
}
