/// Direction of an open position.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSide {
    /// Positive size.
    Long,
    /// Negative size.
    Short,
}

/// Net holding of one instrument.
///
/// `size` is signed (positive long, negative short) and `price` is the
/// volume-weighted average entry price of the open quantity, 0 when flat.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    size: f64,
    price: f64,
}

/// Outcome of applying a fill to a [`Position`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    /// Position size after the fill.
    pub size: f64,
    /// Average price after the fill.
    pub price: f64,
    /// Quantity that reduced existing exposure, signed like the fill.
    pub closed: f64,
    /// Quantity that opened or added exposure, signed like the fill.
    pub opened: f64,
}

impl Position {
    /// Returns the signed size.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns the average entry price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Returns the side, or `None` when flat.
    pub fn side(&self) -> Option<PositionSide> {
        if self.size > 0.0 {
            Some(PositionSide::Long)
        } else if self.size < 0.0 {
            Some(PositionSide::Short)
        } else {
            None
        }
    }

    /// Returns true when no exposure is held.
    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    /// Applies a signed fill of `size` at `price` and splits it into the
    /// closed and opened quantities.
    pub fn update(&mut self, size: f64, price: f64) -> PositionUpdate {
        let old_size = self.size;
        let new_size = old_size + size;

        let (closed, opened) = if old_size == 0.0 || old_size.signum() == size.signum() {
            // adding exposure
            self.price = (self.price * old_size + price * size) / new_size;
            (0.0, size)
        } else if size.abs() <= old_size.abs() {
            // reducing, average price untouched
            if new_size == 0.0 {
                self.price = 0.0;
            }
            (size, 0.0)
        } else {
            // reversal: the remainder opens at the fill price
            self.price = price;
            (-old_size, new_size)
        };

        self.size = new_size;

        PositionUpdate {
            size: self.size,
            price: self.price,
            closed,
            opened,
        }
    }
}

impl From<(f64, f64)> for Position {
    fn from((size, price): (f64, f64)) -> Self {
        Self { size, price }
    }
}
