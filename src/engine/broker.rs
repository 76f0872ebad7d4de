use std::collections::{BTreeMap, HashMap, VecDeque, vec_deque::Drain};

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};

use crate::{
    engine::*,
    errors::Result,
};

/// Construction parameters of a [`Broker`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Starting cash.
    pub cash: f64,
    /// Scheme used for instruments without an override.
    pub commission: CommissionScheme,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            cash: 10_000.0,
            commission: CommissionScheme::default(),
        }
    }
}

/// Current and previous bar of an instrument.
#[derive(Debug, Clone, Copy)]
struct BarWindow {
    current: Candle,
    previous: Option<Candle>,
    // pushed since the last step
    fresh: bool,
}

/// Simulated broker for a single account.
///
/// It owns the cash, the positions, and the pending orders. The driver pushes
/// the bar of every instrument with [`Broker::push_bar`] and then calls
/// [`Broker::next`] once per bar, which settles margined positions and matches
/// every pending order against the bar.
#[derive(Debug, Clone)]
pub struct Broker {
    wallet: Wallet,
    schemes: CommissionSchemes,
    positions: BTreeMap<String, Position>,
    bars: HashMap<String, BarWindow>,
    // order history, the id of an order is its index + 1
    orders: Vec<Order>,
    pending: VecDeque<usize>,
    notifications: VecDeque<Order>,
}

impl std::ops::Deref for Broker {
    type Target = Wallet;

    fn deref(&self) -> &Self::Target {
        &self.wallet
    }
}

impl Broker {
    /// Creates a new broker.
    ///
    /// ### Arguments
    /// * `config` - Starting cash and default commission scheme.
    ///
    /// ### Returns
    /// The new broker or an error when the starting cash is not positive.
    ///
    /// ### Example
    /// ```rust
    /// use bts_broker::prelude::*;
    ///
    /// let broker = Broker::new(BrokerConfig::default()).unwrap();
    /// assert_eq!(broker.cash(), 10_000.0);
    /// ```
    pub fn new(config: BrokerConfig) -> Result<Self> {
        Ok(Self {
            wallet: Wallet::new(config.cash)?,
            schemes: CommissionSchemes::new(config.commission),
            positions: BTreeMap::new(),
            bars: HashMap::new(),
            orders: Vec::new(),
            pending: VecDeque::new(),
            notifications: VecDeque::new(),
        })
    }

    /// Overwrites the cash and the starting cash.
    pub fn set_cash(&mut self, cash: f64) {
        self.wallet.set_cash(cash);
    }

    /// Returns the scheme applied to `instrument`.
    pub fn commission_scheme(&self, instrument: &str) -> &CommissionScheme {
        self.schemes.get(instrument)
    }

    /// Registers `scheme` for `instrument`, or as default when `None`.
    pub fn set_commission_scheme(&mut self, scheme: CommissionScheme, instrument: Option<&str>) {
        self.schemes.set(scheme, instrument);
    }

    /// Builds and registers a scheme, see [`CommissionScheme::new`].
    pub fn set_commission(
        &mut self,
        commission: f64,
        margin: Option<f64>,
        mult: f64,
        instrument: Option<&str>,
    ) -> Result<()> {
        let scheme = CommissionScheme::new(commission, margin, mult)?;
        self.schemes.set(scheme, instrument);
        Ok(())
    }

    /// Feeds the next bar of `instrument`.
    ///
    /// A bar replaced before [`Broker::next`] ran is still settled, but no
    /// order is matched against it.
    pub fn push_bar(&mut self, instrument: &str, candle: Candle) {
        if let Some(window) = self.bars.get(instrument).filter(|w| w.fresh) {
            warn!("{instrument}: bar at {} replaced before a step", window.current.datetime());
            if let (Some(previous), Some(position)) = (window.previous, self.positions.get(instrument)) {
                let scheme = self.schemes.get(instrument);
                let pnl = scheme.mark_to_market(position.size(), previous.close(), window.current.close());
                self.wallet.settle(pnl);
            }
        }

        match self.bars.get_mut(instrument) {
            Some(window) => {
                window.previous = Some(window.current);
                window.current = candle;
                window.fresh = true;
            }
            None => {
                let window = BarWindow {
                    current: candle,
                    previous: None,
                    fresh: true,
                };
                self.bars.insert(instrument.to_owned(), window);
            }
        }
    }

    /// Returns the last bar fed for `instrument`.
    pub fn bar(&self, instrument: &str) -> Option<&Candle> {
        self.bars.get(instrument).map(|w| &w.current)
    }

    /// Returns the bar before the last one fed for `instrument`.
    pub fn previous_bar(&self, instrument: &str) -> Option<&Candle> {
        self.bars.get(instrument).and_then(|w| w.previous.as_ref())
    }

    /// Returns the position of `instrument` (flat when never traded).
    pub fn position(&self, instrument: &str) -> Position {
        self.positions.get(instrument).copied().unwrap_or_default()
    }

    /// Returns the cash plus the value of the positions of `instruments`, or
    /// of every position when `None`, at the last close.
    pub fn value(&self, instruments: Option<&[&str]>) -> f64 {
        let positions_value: f64 = match instruments {
            Some(names) => names.iter().map(|name| self.position_value(name)).sum(),
            None => self.positions.keys().map(|name| self.position_value(name)).sum(),
        };
        self.wallet.cash() + positions_value
    }

    fn position_value(&self, instrument: &str) -> f64 {
        match (self.positions.get(instrument), self.bars.get(instrument)) {
            (Some(position), Some(window)) => self
                .schemes
                .get(instrument)
                .position_value(position, window.current.close()),
            _ => 0.0,
        }
    }

    /// Returns an iterator over every order ever submitted.
    pub fn orders(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }

    /// Returns the current state of the order `id`.
    pub fn order(&self, id: u64) -> Option<&Order> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.orders.get(index)
    }

    /// Returns an iterator over the pending orders, in evaluation order.
    pub fn pending(&self) -> impl Iterator<Item = &Order> {
        self.pending.iter().map(|&index| &self.orders[index])
    }

    /// Removes and returns the order notifications, oldest first.
    pub fn drain_notifications(&mut self) -> Drain<'_, Order> {
        self.notifications.drain(..)
    }

    /// Places a buy order.
    ///
    /// ### Arguments
    /// * `owner` - Name of the strategy placing the order.
    /// * `instrument` - Instrument to trade.
    /// * `size` - Positive quantity.
    /// * `exec_type` - Execution type, `Market` when `None`.
    /// * `valid` - The order expires on the first bar after this moment.
    ///
    /// ### Returns
    /// A snapshot of the accepted order, or an error on invalid size or price.
    ///
    /// ### Example
    /// ```rust
    /// use bts_broker::prelude::*;
    /// use chrono::{DateTime, Duration};
    ///
    /// let mut broker = Broker::new(BrokerConfig::default()).unwrap();
    /// let order = broker.buy("me", "AAPL", 10.0, Some(ExecType::Limit(95.0)), None).unwrap();
    /// assert_eq!(order.status(), OrderStatus::Accepted);
    ///
    /// let candle = CandleBuilder::builder()
    ///     .open(100.0)
    ///     .high(101.0)
    ///     .low(94.0)
    ///     .close(96.0)
    ///     .datetime(DateTime::default() + Duration::days(1))
    ///     .build()
    ///     .unwrap();
    /// broker.push_bar("AAPL", candle);
    /// broker.next();
    ///
    /// assert_eq!(broker.position("AAPL").size(), 10.0);
    /// assert_eq!(broker.cash(), 10_000.0 - 950.0);
    /// ```
    pub fn buy(
        &mut self,
        owner: &str,
        instrument: &str,
        size: f64,
        exec_type: Option<ExecType>,
        valid: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        self.create(owner, instrument, OrderSide::Buy, size, exec_type, valid)
    }

    /// Places a sell order, see [`Broker::buy`].
    pub fn sell(
        &mut self,
        owner: &str,
        instrument: &str,
        size: f64,
        exec_type: Option<ExecType>,
        valid: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        self.create(owner, instrument, OrderSide::Sell, size, exec_type, valid)
    }

    /// Places the order flattening the position of `instrument`.
    ///
    /// ### Returns
    /// `None` when the position is already flat.
    pub fn close(
        &mut self,
        owner: &str,
        instrument: &str,
        exec_type: Option<ExecType>,
        valid: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>> {
        let size = self.position(instrument).size();
        match self.position(instrument).side() {
            Some(PositionSide::Long) => self.sell(owner, instrument, size, exec_type, valid).map(Some),
            Some(PositionSide::Short) => self.buy(owner, instrument, -size, exec_type, valid).map(Some),
            None => Ok(None),
        }
    }

    fn create(
        &mut self,
        owner: &str,
        instrument: &str,
        side: OrderSide,
        size: f64,
        exec_type: Option<ExecType>,
        valid: Option<DateTime<Utc>>,
    ) -> Result<Order> {
        let id = self.orders.len() as u64 + 1;
        let exec_type = exec_type.unwrap_or(ExecType::Market);
        let order = Order::new(id, owner, instrument, side, size, exec_type, valid)?;
        Ok(self.submit(order))
    }

    fn submit(&mut self, mut order: Order) -> Order {
        // TODO: admission control, simulate the pending orders against the
        // positions and reject the order when the margin requirement fails.
        order.submit();
        order.accept();
        debug!(
            "order {} accepted: {:?} {} {} {:?}",
            order.id(),
            order.side(),
            order.size(),
            order.instrument(),
            order.exec_type()
        );
        self.orders.push(order.clone());
        self.pending.push_back(self.orders.len() - 1);
        order
    }

    /// Cancels a pending order.
    ///
    /// ### Returns
    /// False when the order is not pending (already filled, expired, or
    /// canceled).
    pub fn cancel(&mut self, order: &Order) -> bool {
        let Some(slot) = self.pending.iter().position(|&index| self.orders[index] == *order) else {
            return false;
        };
        let Some(index) = self.pending.remove(slot) else {
            return false;
        };

        let order = &mut self.orders[index];
        order.cancel();
        debug!("order {} canceled", order.id());
        self.notifications.push_back(order.clone());
        true
    }

    /// Processes one bar: settles margined positions, then evaluates every
    /// pending order once.
    pub fn next(&mut self) {
        self.mark_to_market();

        for _ in 0..self.pending.len() {
            let Some(index) = self.pending.pop_front() else {
                break;
            };
            if self.evaluate(index) {
                self.pending.push_back(index);
            }
        }

        for window in self.bars.values_mut() {
            window.fresh = false;
        }
    }

    fn mark_to_market(&mut self) {
        for (instrument, position) in &self.positions {
            if position.is_flat() {
                continue;
            }
            let Some(window) = self.bars.get(instrument).filter(|w| w.fresh) else {
                continue;
            };
            let Some(previous) = window.previous else {
                continue;
            };

            let scheme = self.schemes.get(instrument);
            let pnl = scheme.mark_to_market(position.size(), previous.close(), window.current.close());
            if pnl != 0.0 {
                trace!("{instrument} settled {pnl}");
                self.wallet.settle(pnl);
            }
        }
    }

    /// Evaluates the order at `index` against its bar.
    ///
    /// ### Returns
    /// True when the order is still alive and has to be re-queued.
    fn evaluate(&mut self, index: usize) -> bool {
        let window = match self.bars.get(self.orders[index].instrument()) {
            Some(window) if window.fresh => *window,
            _ => {
                warn!(
                    "order {}: no bar for {} on this step",
                    self.orders[index].id(),
                    self.orders[index].instrument()
                );
                return true;
            }
        };

        let order = &mut self.orders[index];
        if order.expire(window.current.datetime()) {
            debug!("order {} expired", order.id());
            self.notifications.push_back(order.clone());
            return false;
        }

        if let Some((datetime, price)) = fill(order, &window) {
            self.execute(index, datetime, price, window.current.close());
        }

        self.orders[index].alive()
    }

    /// Applies a total fill of the order at `index` to the position and the
    /// cash, then notifies it.
    fn execute(&mut self, index: usize, datetime: DateTime<Utc>, price: f64, close: f64) {
        let size = self.orders[index].executed().remaining;
        let instrument = self.orders[index].instrument();
        let scheme = *self.schemes.get(instrument);

        let position = self.positions.entry(instrument.to_owned()).or_default();
        let update = position.update(size, price);
        let position = *position;

        let mut closed = Fill::default();
        if update.closed != 0.0 {
            closed = Fill {
                size: update.closed,
                value: scheme.operation_cost(update.closed, price),
                commission: scheme.commission(update.closed, price),
            };
            self.wallet.add(scheme.close_cash_flow(update.closed, price));
            self.wallet.sub_commission(closed.commission);
            // the sweep already credited this quantity up to the close
            self.wallet.settle(scheme.mark_to_market(update.closed, price, close));
        }

        let mut opened = Fill::default();
        if update.opened != 0.0 {
            opened = Fill {
                size: update.opened,
                value: scheme.operation_cost(update.opened, price),
                commission: scheme.commission(update.opened, price),
            };
            self.wallet.add(scheme.open_cash_flow(update.opened, price));
            self.wallet.sub_commission(opened.commission);
            // next sweep starts from this close
            self.wallet.settle(scheme.mark_to_market(update.opened, price, close));
        }

        let order = &mut self.orders[index];
        order.execute(datetime, size, price, closed, opened, scheme.margin(), position);
        debug!(
            "order {} filled: {} {} @ {} (position {} @ {})",
            order.id(),
            size,
            order.instrument(),
            price,
            position.size(),
            position.price()
        );
        self.notifications.push_back(order.clone());
    }

    /// Resets cash, positions, bars, orders, and notifications. Commission
    /// schemes are kept.
    pub fn reset(&mut self) {
        self.wallet.reset();
        self.positions = BTreeMap::new();
        self.bars = HashMap::new();
        self.orders = Vec::new();
        self.pending = VecDeque::new();
        self.notifications = VecDeque::new();
    }
}

/// Returns the fill timestamp and price of `order` on `window`, if any.
///
/// Arms stop-limit orders whose trigger is reached.
fn fill(order: &mut Order, window: &BarWindow) -> Option<(DateTime<Utc>, f64)> {
    let bar = &window.current;
    let now = bar.datetime();
    let side = order.side();

    let price = match order.exec_type() {
        ExecType::Market => Some(bar.open()),
        ExecType::Close => {
            let previous = window.previous?;
            let (current, last) = (now, previous.datetime());
            // intraday: time changes between bars, daily: same time, date changes
            if current.time() != last.time() || current.date_naive() != last.date_naive() {
                return Some((last, previous.close()));
            }
            None
        }
        ExecType::Limit(limit) => limit_price(side, limit, bar),
        ExecType::StopLimit { limit, .. } if order.triggered() => limit_price(side, limit, bar),
        ExecType::Stop(trigger) => stop_price(side, trigger, bar),
        ExecType::StopLimit { trigger, limit } => stop_limit_price(order, trigger, limit, bar),
    };

    price.map(|price| (now, price))
}

fn limit_price(side: OrderSide, limit: f64, bar: &Candle) -> Option<f64> {
    match side {
        OrderSide::Buy => {
            if limit >= bar.open() {
                Some(bar.open())
            } else if limit >= bar.low() {
                Some(limit)
            } else {
                None
            }
        }
        OrderSide::Sell => {
            if limit <= bar.open() {
                Some(bar.open())
            } else if limit <= bar.high() {
                Some(limit)
            } else {
                None
            }
        }
    }
}

fn stop_price(side: OrderSide, trigger: f64, bar: &Candle) -> Option<f64> {
    match side {
        OrderSide::Buy => {
            if bar.open() >= trigger {
                Some(bar.open())
            } else if bar.high() >= trigger {
                Some(trigger)
            } else {
                None
            }
        }
        OrderSide::Sell => {
            if bar.open() <= trigger {
                Some(bar.open())
            } else if bar.low() <= trigger {
                Some(trigger)
            } else {
                None
            }
        }
    }
}

fn stop_limit_price(order: &mut Order, trigger: f64, limit: f64, bar: &Candle) -> Option<f64> {
    let (open, close) = (bar.open(), bar.close());

    match order.side() {
        OrderSide::Buy => {
            if open >= trigger {
                order.trigger();
                limit_price(OrderSide::Buy, limit, bar)
            } else if bar.high() >= trigger {
                order.trigger();
                if open > close {
                    if limit >= trigger {
                        Some(trigger)
                    } else if limit >= close {
                        Some(limit)
                    } else {
                        None
                    }
                } else {
                    (limit >= trigger).then_some(trigger)
                }
            } else {
                None
            }
        }
        OrderSide::Sell => {
            if open <= trigger {
                order.trigger();
                // gap below the trigger: the limit is compared with the bar open
                limit_price(OrderSide::Sell, limit, bar)
            } else if bar.low() <= trigger {
                order.trigger();
                if open <= close {
                    if limit <= trigger {
                        Some(trigger)
                    } else if limit <= close {
                        Some(limit)
                    } else {
                        None
                    }
                } else {
                    (limit <= trigger).then_some(trigger)
                }
            } else {
                None
            }
        }
    }
}
