use std::sync::Arc;

use log::info;

use crate::{
    engine::*,
    errors::{Error, Result},
};

/// Named series of candles.
#[derive(Debug, Clone)]
struct Feed {
    name: String,
    candles: Arc<[Candle]>,
}

/// Lock-step driver feeding candle series to a [`Broker`].
#[derive(Debug, Clone)]
pub struct Backtest {
    broker: Broker,
    feeds: Vec<Feed>,
}

impl std::ops::Deref for Backtest {
    type Target = Broker;

    fn deref(&self) -> &Self::Target {
        &self.broker
    }
}

impl Backtest {
    /// Creates a new backtest instance without feeds.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        Ok(Self {
            broker: Broker::new(config)?,
            feeds: Vec::new(),
        })
    }

    /// Returns the broker for configuration or order handling.
    pub fn broker_mut(&mut self) -> &mut Broker {
        &mut self.broker
    }

    /// Adds the candles of instrument `name`.
    ///
    /// Every feed must hold as many candles as the ones already added, the
    /// n-th candles of all feeds form the n-th bar.
    pub fn add_feed(&mut self, name: &str, candles: Arc<[Candle]>) -> Result<()> {
        if candles.is_empty() {
            return Err(Error::CandleDataEmpty);
        }
        if let Some(first) = self.feeds.first() {
            if first.candles.len() != candles.len() {
                return Err(Error::FeedLengthMismatch {
                    name: name.to_owned(),
                    got: candles.len(),
                    expected: first.candles.len(),
                });
            }
        }

        self.feeds.push(Feed {
            name: name.to_owned(),
            candles,
        });
        Ok(())
    }

    /// Runs the backtest, executing the strategy after each broker step.
    ///
    /// Orders placed by the strategy on a bar are evaluated from the next bar.
    ///
    /// ### Arguments
    /// * `strategy` - A closure that takes the broker.
    ///
    /// ### Returns
    /// Ok if successful, or the first error of the strategy.
    ///
    /// ### Example
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use bts_broker::prelude::*;
    /// use chrono::{DateTime, Duration};
    ///
    /// let candles = (0..3)
    ///     .map(|i| {
    ///         let price = 100.0 + i as f64;
    ///         CandleBuilder::builder()
    ///             .open(price)
    ///             .high(price + 1.0)
    ///             .low(price - 1.0)
    ///             .close(price)
    ///             .datetime(DateTime::default() + Duration::days(i))
    ///             .build()
    ///             .unwrap()
    ///     })
    ///     .collect::<Vec<_>>();
    ///
    /// let mut bts = Backtest::new(BrokerConfig::default()).unwrap();
    /// bts.add_feed("AAPL", Arc::from_iter(candles)).unwrap();
    /// bts.run(|broker| {
    ///     if broker.position("AAPL").is_flat() && broker.pending().next().is_none() {
    ///         broker.buy("me", "AAPL", 1.0, None, None)?;
    ///     }
    ///     Ok(())
    /// })
    /// .unwrap();
    ///
    /// // bought at the open of the second bar
    /// assert_eq!(bts.position("AAPL").price(), 101.0);
    /// ```
    pub fn run<S>(&mut self, mut strategy: S) -> Result<()>
    where
        S: FnMut(&mut Broker) -> Result<()>,
    {
        let Some(first) = self.feeds.first() else {
            return Err(Error::NoFeeds);
        };
        let len = first.candles.len();
        info!("running {} feed(s) over {len} bars", self.feeds.len());

        for index in 0..len {
            for feed in &self.feeds {
                self.broker.push_bar(&feed.name, feed.candles[index]);
            }
            self.broker.next();
            strategy(&mut self.broker)?;
        }

        info!(
            "done: cash {:.2}, value {:.2}",
            self.broker.cash(),
            self.broker.value(None)
        );
        Ok(())
    }

    /// Resets the broker to its initial state, feeds are kept.
    pub fn reset(&mut self) {
        self.broker.reset();
    }
}
