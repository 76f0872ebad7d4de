use std::collections::HashMap;

use crate::{
    engine::Position,
    errors::{Error, Result},
};

/// Pricing and margin rules of an instrument.
///
/// A scheme with a margin describes a margined (futures-like) instrument:
/// cash effects use the margin per unit and mark-to-market deltas. Without a
/// margin it describes a cash instrument whose cash effects use the notional
/// `price * size * mult`.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "SchemeRecord")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionScheme {
    commission: f64,
    margin: Option<f64>,
    mult: f64,
}

/// Unvalidated fields of a serialized [`CommissionScheme`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SchemeRecord {
    commission: f64,
    margin: Option<f64>,
    mult: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<SchemeRecord> for CommissionScheme {
    type Error = Error;

    fn try_from(record: SchemeRecord) -> Result<Self> {
        Self::new(record.commission, record.margin, record.mult)
    }
}

impl Default for CommissionScheme {
    fn default() -> Self {
        Self {
            commission: 0.0,
            margin: None,
            mult: 1.0,
        }
    }
}

impl CommissionScheme {
    /// Creates a new scheme.
    ///
    /// ### Arguments
    /// * `commission` - Rate applied to the notional for cash instruments
    ///   (e.g. 0.001 for 0.1%), or fee per contract for margined ones.
    /// * `margin` - Cash reserved per unit, `None` for cash instruments.
    /// * `mult` - Contract multiplier.
    ///
    /// ### Returns
    /// The scheme, or an error when a value is out of range.
    pub fn new(commission: f64, margin: Option<f64>, mult: f64) -> Result<Self> {
        if !(commission >= 0.0 && commission.is_finite()) {
            return Err(Error::NegCommission(commission));
        }
        if let Some(margin) = margin {
            if !(margin > 0.0 && margin.is_finite()) {
                return Err(Error::InvalidMargin(margin));
            }
        }
        if !(mult > 0.0 && mult.is_finite()) {
            return Err(Error::InvalidMultiplier(mult));
        }

        Ok(Self { commission, margin, mult })
    }

    /// Returns the commission rate.
    pub fn rate(&self) -> f64 {
        self.commission
    }

    /// Returns the margin per unit, if any.
    pub fn margin(&self) -> Option<f64> {
        self.margin
    }

    /// Returns the contract multiplier.
    pub fn mult(&self) -> f64 {
        self.mult
    }

    /// Returns true for margined (futures-like) instruments.
    pub fn is_margined(&self) -> bool {
        self.margin.is_some()
    }

    /// Cash needed to carry `size` units at `price`.
    pub fn operation_cost(&self, size: f64, price: f64) -> f64 {
        match self.margin {
            Some(margin) => margin * size.abs(),
            None => price * size.abs() * self.mult,
        }
    }

    /// Commission charged for trading `size` units at `price`.
    pub fn commission(&self, size: f64, price: f64) -> f64 {
        match self.margin {
            Some(_) => size.abs() * self.commission,
            None => price * size.abs() * self.mult * self.commission,
        }
    }

    /// Profit or loss of holding `size` units while the price moves from
    /// `from` to `to`. Always 0 for cash instruments.
    pub fn mark_to_market(&self, size: f64, from: f64, to: f64) -> f64 {
        match self.margin {
            Some(_) => (to - from) * size * self.mult,
            None => 0.0,
        }
    }

    /// Value of `position` at `price`.
    ///
    /// Margined positions are worth the margin posted, not the market value.
    pub fn position_value(&self, position: &Position, price: f64) -> f64 {
        match self.margin {
            Some(margin) => margin * position.size().abs(),
            None => position.size() * price * self.mult,
        }
    }

    /// Signed cash movement for opening `size` units at `price`.
    ///
    /// Margin is reserved regardless of direction; the notional of a cash
    /// instrument is paid for longs and received for shorts.
    pub fn open_cash_flow(&self, size: f64, price: f64) -> f64 {
        match self.margin {
            Some(_) => -self.operation_cost(size, price),
            None => -size * price * self.mult,
        }
    }

    /// Signed cash movement for closing `size` units (signed like the fill)
    /// at `price`.
    pub fn close_cash_flow(&self, size: f64, price: f64) -> f64 {
        match self.margin {
            Some(_) => self.operation_cost(size, price),
            None => -size * price * self.mult,
        }
    }
}

/// Per-instrument schemes with a default used as fallback.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct CommissionSchemes {
    default: CommissionScheme,
    overrides: HashMap<String, CommissionScheme>,
}

impl CommissionSchemes {
    /// Creates the map with `default` as fallback.
    pub fn new(default: CommissionScheme) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Returns the scheme of `instrument`, or the default one.
    pub fn get(&self, instrument: &str) -> &CommissionScheme {
        self.overrides.get(instrument).unwrap_or(&self.default)
    }

    /// Registers `scheme` for `instrument`, or replaces the default when
    /// `instrument` is `None`.
    pub fn set(&mut self, scheme: CommissionScheme, instrument: Option<&str>) {
        match instrument {
            Some(name) => {
                self.overrides.insert(name.to_owned(), scheme);
            }
            None => self.default = scheme,
        }
    }
}
