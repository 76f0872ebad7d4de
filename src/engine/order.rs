use chrono::{DateTime, Utc};

use crate::{
    engine::Position,
    errors::{Error, Result},
};

/// Represents the side of an order (buy or sell).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSide {
    /// Positive size.
    Buy,
    /// Negative size.
    Sell,
}

impl OrderSide {
    /// Sign applied to the order size.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

/// Execution type of an order with the reference prices it needs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecType {
    /// Fills at the next bar open.
    Market,
    /// Fills at the close of the bar that just ended.
    Close,
    /// Fills at the limit price or better.
    Limit(f64),
    /// Fills once the trigger price is touched.
    Stop(f64),
    /// Arms at the trigger price, then behaves as a limit order.
    StopLimit {
        /// Price arming the order.
        trigger: f64,
        /// Worst acceptable fill price once armed.
        limit: f64,
    },
}

impl ExecType {
    /// Returns the limit price, for `Limit` and `StopLimit`.
    pub fn limit(&self) -> Option<f64> {
        match self {
            Self::Limit(limit) | Self::StopLimit { limit, .. } => Some(*limit),
            _ => None,
        }
    }

    /// Returns the trigger price, for `Stop` and `StopLimit`.
    pub fn trigger(&self) -> Option<f64> {
        match self {
            Self::Stop(trigger) | Self::StopLimit { trigger, .. } => Some(*trigger),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        for price in self.limit().into_iter().chain(self.trigger()) {
            if !(price > 0.0 && price.is_finite()) {
                return Err(Error::InvalidPrice(price));
            }
        }
        Ok(())
    }
}

/// Lifecycle status of an order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderStatus {
    /// Built, not yet handed to the broker.
    Created,
    /// Handed to the broker.
    Submitted,
    /// Pending, evaluated on every bar.
    Accepted,
    /// Never reached: fills are always total.
    Partial,
    /// Filled.
    Completed,
    /// Canceled by its owner.
    Canceled,
    /// Validity elapsed before a fill.
    Expired,
    /// Refused for lack of margin.
    Margin,
    /// Refused by the broker.
    Rejected,
}

/// One leg (closing or opening) of an execution.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fill {
    /// Signed quantity.
    pub size: f64,
    /// Cash reserved or released.
    pub value: f64,
    /// Commission charged.
    pub commission: f64,
}

/// Execution record of an order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Execution {
    /// Size still to be filled.
    pub remaining: f64,
    /// Filled size.
    pub size: f64,
    /// Fill price.
    pub price: f64,
    /// Fill timestamp.
    pub datetime: Option<DateTime<Utc>>,
    /// Closing leg.
    pub closed: Fill,
    /// Opening leg.
    pub opened: Fill,
    /// Margin per unit of the instrument at fill time.
    pub margin: Option<f64>,
    /// Position right after the fill.
    pub position: Position,
}

impl Execution {
    /// Total cash reserved or released by both legs.
    pub fn value(&self) -> f64 {
        self.closed.value + self.opened.value
    }

    /// Total commission of both legs.
    pub fn commission(&self) -> f64 {
        self.closed.commission + self.opened.commission
    }
}

/// A trading intent for one instrument.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Order {
    id: u64,
    owner: String,
    instrument: String,
    side: OrderSide,
    exec_type: ExecType,
    size: f64,
    valid: Option<DateTime<Utc>>,
    status: OrderStatus,
    triggered: bool,
    executed: Execution,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Order {
    /// Creates an order in the `Created` state.
    ///
    /// `size` is the unsigned quantity; the side fixes its sign.
    pub(crate) fn new(
        id: u64,
        owner: &str,
        instrument: &str,
        side: OrderSide,
        size: f64,
        exec_type: ExecType,
        valid: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if !(size > 0.0 && size.is_finite()) {
            return Err(Error::InvalidSize(size));
        }
        exec_type.validate()?;

        let size = side.sign() * size;
        Ok(Self {
            id,
            owner: owner.to_owned(),
            instrument: instrument.to_owned(),
            side,
            exec_type,
            size,
            valid,
            status: OrderStatus::Created,
            triggered: false,
            executed: Execution {
                remaining: size,
                ..Default::default()
            },
        })
    }

    /// Returns the id, unique per broker.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the owner name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the instrument name.
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Returns the side.
    pub fn side(&self) -> OrderSide {
        self.side
    }

    /// Returns the execution type.
    pub fn exec_type(&self) -> ExecType {
        self.exec_type
    }

    /// Returns the signed size.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns the validity limit.
    pub fn valid(&self) -> Option<DateTime<Utc>> {
        self.valid
    }

    /// Returns the status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns true once a stop-limit order has been armed.
    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Returns the execution record.
    pub fn executed(&self) -> &Execution {
        &self.executed
    }

    /// Returns true while the order can still fill.
    pub fn alive(&self) -> bool {
        self.status == OrderStatus::Accepted && self.executed.remaining != 0.0
    }

    pub(crate) fn submit(&mut self) {
        if self.status == OrderStatus::Created {
            self.status = OrderStatus::Submitted;
        }
    }

    pub(crate) fn accept(&mut self) {
        if matches!(self.status, OrderStatus::Created | OrderStatus::Submitted) {
            self.status = OrderStatus::Accepted;
        }
    }

    pub(crate) fn cancel(&mut self) {
        if self.status == OrderStatus::Accepted {
            self.status = OrderStatus::Canceled;
        }
    }

    pub(crate) fn trigger(&mut self) {
        self.triggered = true;
    }

    /// Expires the order when `now` is past its validity.
    pub(crate) fn expire(&mut self, now: DateTime<Utc>) -> bool {
        match self.valid {
            Some(valid) if self.status == OrderStatus::Accepted && now > valid => {
                self.status = OrderStatus::Expired;
                true
            }
            _ => false,
        }
    }

    /// Records a total fill.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn execute(
        &mut self,
        datetime: DateTime<Utc>,
        size: f64,
        price: f64,
        closed: Fill,
        opened: Fill,
        margin: Option<f64>,
        position: Position,
    ) {
        self.executed = Execution {
            remaining: self.executed.remaining - size,
            size,
            price,
            datetime: Some(datetime),
            closed,
            opened,
            margin,
            position,
        };
        self.status = OrderStatus::Completed;
    }
}
