use std::{fs::File, io::BufReader, path::PathBuf};

use chrono::{DateTime, Utc, serde::ts_milliseconds};
use serde::Deserialize;

use crate::{
    engine::{Candle, CandleBuilder},
    errors::{Error, Result},
};

// "open_time": 1759813200000,
// "open_price": 124499.99,
// "high_price": 124640.76,
// "low_price": 124240.37,
// "close_price": 124414.17,
// "volume": 424.20697,
// "close_time": 1759816799999,

/// One bar as stored in a candle file.
#[derive(Debug, Clone, Deserialize)]
struct CandleRecord {
    #[serde(alias = "open_price")]
    open: f64,
    #[serde(alias = "high_price")]
    high: f64,
    #[serde(alias = "low_price")]
    low: f64,
    #[serde(alias = "close_price")]
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(alias = "open_time", with = "ts_milliseconds")]
    datetime: DateTime<Utc>,
}

impl TryFrom<CandleRecord> for Candle {
    type Error = Error;

    fn try_from(record: CandleRecord) -> Result<Self> {
        CandleBuilder::builder()
            .open(record.open)
            .high(record.high)
            .low(record.low)
            .close(record.close)
            .volume(record.volume)
            .datetime(record.datetime)
            .build()
    }
}

/// Reads a JSON array of bars from `filepath`.
///
/// Each bar carries `open`, `high`, `low`, `close` (or their `*_price`
/// variants), an optional `volume`, and a millisecond timestamp under
/// `datetime` or `open_time`. Every bar is validated like a built candle.
pub fn load_candles(filepath: PathBuf) -> Result<Vec<Candle>> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let records: Vec<CandleRecord> = serde_json::from_reader(reader)?;
    records.into_iter().map(Candle::try_from).collect()
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;

    fn write(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("bts-broker-{}-{name}.json", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_exchange_format() {
        let path = write(
            "exchange",
            r#"[
                {"open_time": 1759813200000, "open_price": 124499.99, "high_price": 124640.76,
                 "low_price": 124240.37, "close_price": 124414.17, "volume": 424.20697,
                 "close_time": 1759816799999},
                {"open_time": 1759816800000, "open_price": 124414.17, "high_price": 124500.0,
                 "low_price": 124300.0, "close_price": 124450.0, "volume": 12.5,
                 "close_time": 1759820399999}
            ]"#,
        );

        let candles = load_candles(path.clone()).unwrap();
        fs::remove_file(path).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open(), 124499.99);
        assert_eq!(candles[0].datetime(), DateTime::from_timestamp_millis(1759813200000).unwrap());
        assert_eq!(candles[1].close(), 124450.0);
    }

    #[test]
    fn load_short_format() {
        let path = write(
            "short",
            r#"[{"datetime": 0, "open": 10.0, "high": 11.0, "low": 9.0, "close": 10.5}]"#,
        );

        let candles = load_candles(path.clone()).unwrap();
        fs::remove_file(path).unwrap();

        assert_eq!(candles[0].volume(), 0.0);
        assert_eq!(candles[0].datetime(), DateTime::<Utc>::default());
    }

    #[test]
    fn load_inconsistent_bar() {
        let path = write(
            "invalid",
            r#"[{"datetime": 0, "open": 10.0, "high": 9.0, "low": 8.0, "close": 8.5}]"#,
        );

        let result = load_candles(path.clone());
        fs::remove_file(path).unwrap();

        assert!(matches!(result, Err(Error::InvalidCandle { .. })));
    }

    #[test]
    fn load_missing_file() {
        let result = load_candles(PathBuf::from("/nonexistent/bts-broker.json"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
