use chrono::{DateTime, Utc};

use crate::errors::{Error, Result};

/// One OHLCV price sample stamped with the bar's timestamp.
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "CandleFields")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    datetime: DateTime<Utc>,
}

impl Candle {
    /// Opening price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Highest traded price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Lowest traded price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Closing price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Timestamp of the bar.
    pub fn datetime(&self) -> DateTime<Utc> {
        self.datetime
    }
}

/// Unvalidated fields of a serialized [`Candle`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct CandleFields {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    datetime: DateTime<Utc>,
}

#[cfg(feature = "serde")]
impl TryFrom<CandleFields> for Candle {
    type Error = Error;

    fn try_from(fields: CandleFields) -> Result<Self> {
        CandleBuilder::builder()
            .open(fields.open)
            .high(fields.high)
            .low(fields.low)
            .close(fields.close)
            .volume(fields.volume)
            .datetime(fields.datetime)
            .build()
    }
}

/// Builder for [`Candle`]. Every price field and the timestamp are required,
/// the volume defaults to zero.
///
/// ### Example
/// ```rust
/// use bts_broker::prelude::*;
/// use chrono::DateTime;
///
/// let candle = CandleBuilder::builder()
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(1.0)
///     .datetime(DateTime::default())
///     .build()
///     .unwrap();
/// assert_eq!(candle.close(), 105.0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct CandleBuilder {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    datetime: Option<DateTime<Utc>>,
}

impl CandleBuilder {
    /// Starts a new, empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the opening price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the highest price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the lowest price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the closing price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the traded volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Sets the bar timestamp.
    pub fn datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = Some(datetime);
        self
    }

    /// Validates the fields and returns the candle.
    ///
    /// The high must be the largest price of the bar and the low the smallest.
    pub fn build(self) -> Result<Candle> {
        let open = self.open.ok_or(Error::MissingField("open"))?;
        let high = self.high.ok_or(Error::MissingField("high"))?;
        let low = self.low.ok_or(Error::MissingField("low"))?;
        let close = self.close.ok_or(Error::MissingField("close"))?;
        let datetime = self.datetime.ok_or(Error::MissingField("datetime"))?;
        let volume = self.volume.unwrap_or(0.0);

        let finite = [open, high, low, close].iter().all(|p| p.is_finite());
        if !finite || high < low || high < open.max(close) || low > open.min(close) {
            return Err(Error::InvalidCandle { open, high, low, close });
        }

        Ok(Candle {
            open,
            high,
            low,
            close,
            volume,
            datetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_valid_candle() {
        let candle = CandleBuilder::builder()
            .open(100.0)
            .high(111.0)
            .low(99.0)
            .close(110.0)
            .datetime(DateTime::from_timestamp(1515151515, 0).unwrap())
            .build()
            .unwrap();

        assert_eq!(candle.open(), 100.0);
        assert_eq!(candle.high(), 111.0);
        assert_eq!(candle.low(), 99.0);
        assert_eq!(candle.close(), 110.0);
        assert_eq!(candle.volume(), 0.0);
    }

    #[test]
    fn missing_field() {
        let result = CandleBuilder::builder().open(100.0).high(111.0).low(99.0).build();
        assert!(matches!(result, Err(Error::MissingField("close"))));
    }

    #[test]
    fn high_below_close_is_rejected() {
        let result = CandleBuilder::builder()
            .open(100.0)
            .high(105.0)
            .low(99.0)
            .close(110.0)
            .datetime(DateTime::default())
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle { .. })));
    }

    #[test]
    fn nan_price_is_rejected() {
        let result = CandleBuilder::builder()
            .open(f64::NAN)
            .high(105.0)
            .low(99.0)
            .close(100.0)
            .datetime(DateTime::default())
            .build();
        assert!(matches!(result, Err(Error::InvalidCandle { .. })));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_validates() {
        let candle = CandleBuilder::builder()
            .open(100.0)
            .high(111.0)
            .low(99.0)
            .close(110.0)
            .volume(3.0)
            .datetime(DateTime::from_timestamp(1515151515, 0).unwrap())
            .build()
            .unwrap();
        let json = serde_json::to_string(&candle).unwrap();
        assert_eq!(serde_json::from_str::<Candle>(&json).unwrap(), candle);

        let json = r#"{"open": 10.0, "high": 1.0, "low": 50.0, "close": 20.0, "volume": 0.0,
                       "datetime": "2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Candle>(json).is_err());
    }
}
