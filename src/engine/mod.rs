//! Core simulation components.
//!
//! This module provides the fundamental types for order matching:
//! - `Candle`: OHLCV bar with its timestamp.
//! - `CommissionScheme`: pricing and margin rules of an instrument.
//! - `Position`: net holding and average price of an instrument.
//! - `Order`: trading intent and its lifecycle.
//! - `Wallet`: cash ledger.
//! - `Broker`: matches pending orders against each bar and keeps the books.
//! - `Backtest`: feeds candle series to the broker bar by bar.

mod broker;
mod bts;
mod candle;
mod commission;
mod order;
mod position;
mod wallet;

pub use broker::*;
pub use bts::*;
pub use candle::*;
pub use commission::*;
pub use order::*;
pub use position::*;
pub use wallet::*;
