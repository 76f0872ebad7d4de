//! # Trend following on a margined future
//!
//! Goes long one future when the close crosses above its moving average, with a
//! protective stop below the entry. The position is flattened at the close of
//! the bar when the price falls back under the average.
//!
//! Run with `RUST_LOG=debug` to follow every order.

use std::{collections::VecDeque, sync::Arc};

use bts_broker::prelude::*;
use chrono::{DateTime, Duration};

const PERIOD: usize = 20;

/// Generates deterministic candle data.
fn generate_sample_candles(len: i64, seed: f64, base_price: f64) -> Vec<Candle> {
    let start = DateTime::default();
    let mut open = base_price;

    (0..len)
        .map(|i| {
            let x = i as f64;
            // slow cycle on top of a mild trend
            let close = base_price + 0.05 * x + 15.0 * (x * 0.05 + seed).sin() + 2.0 * (x * 0.7).cos();
            let high = open.max(close) + 0.5 + (x * 0.3).sin().abs();
            let low = open.min(close) - 0.5 - (x * 0.4).cos().abs();

            let candle = CandleBuilder::builder()
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .volume(1_000.0)
                .datetime(start + Duration::days(i))
                .build();
            open = close;
            candle
        })
        .collect::<Result<Vec<_>>>()
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let candles = generate_sample_candles(500, 3.0, 4_500.0);
    let first_price = candles.first().map(|c| c.close()).unwrap_or_default();
    let last_price = candles.last().map(|c| c.close()).unwrap_or_default();

    let config = BrokerConfig {
        cash: 100_000.0,
        ..Default::default()
    };
    let mut bts = Backtest::new(config)?;
    // 2.5 per contract, 5k margin, 50 per point
    bts.broker_mut().set_commission(2.5, Some(5_000.0), 50.0, Some("ES"))?;
    bts.add_feed("ES", Arc::from_iter(candles))?;

    let mut closes = VecDeque::with_capacity(PERIOD);
    let mut stop: Option<Order> = None;
    let mut trades = 0;

    bts.run(|broker| {
        for order in broker.drain_notifications() {
            if order.status() == OrderStatus::Completed && order.executed().closed.size != 0.0 {
                trades += 1;
            }
        }

        let Some(close) = broker.bar("ES").map(|c| c.close()) else {
            return Ok(());
        };
        if closes.len() == PERIOD {
            closes.pop_front();
        }
        closes.push_back(close);
        if closes.len() < PERIOD {
            return Ok(());
        }
        let average = closes.iter().sum::<f64>() / PERIOD as f64;

        let position = broker.position("ES");
        let waiting = broker.pending().any(|o| o.exec_type() == ExecType::Market);

        if position.is_flat() && !waiting && close > average {
            broker.buy("strategy", "ES", 1.0, None, None)?;
            stop = Some(broker.sell("strategy", "ES", 1.0, Some(ExecType::Stop(close * 0.97)), None)?);
        } else if !position.is_flat() && close < average {
            if let Some(order) = stop.take() {
                broker.cancel(&order);
            }
            broker.close("strategy", "ES", Some(ExecType::Close), None)?;
        } else if position.is_flat() {
            // stopped out
            stop = None;
        }

        Ok(())
    })?;

    let cash = bts.cash();
    let value = bts.value(None);
    let performance = (value - bts.starting_cash()) / bts.starting_cash() * 100.0;
    println!("trades {trades}");
    println!("cash {cash:.2}, value {value:.2} ({performance:.2}%)");
    println!("commission {:.2}, settled {:.2}", bts.commission_paid(), bts.settled_pnl());

    let buy_and_hold = (last_price - first_price) * 50.0;
    println!("one contract held {buy_and_hold:.2}");

    Ok(())
}
