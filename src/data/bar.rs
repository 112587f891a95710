use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BarError {
    #[error("Invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Invalid OHLC values: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Invalid OHLC values: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
    #[error("Missing price in bar at {0}")]
    MissingPrice(NaiveDateTime),
}

//one minute aggregate as delivered by the market-data vendor
//prices may be NaN when the source row had an empty cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        RawBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn has_close(&self) -> bool {
        !self.close.is_nan()
    }
}

//represents a single ohlcv bar on the exchange-local wall clock
//this is what the runner and the backtest engine consume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    //creates a new Bar with validation
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        let bar = Bar::new_unchecked(timestamp, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    //creates a Bar without validation
    pub fn new_unchecked(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    //checks the ohlc invariants without consuming the bar
    pub fn validate(&self) -> Result<(), BarError> {
        if [self.open, self.high, self.low, self.close]
            .iter()
            .any(|p| p.is_nan())
        {
            return Err(BarError::MissingPrice(self.timestamp));
        }

        //validate high >= low
        if self.high < self.low {
            return Err(BarError::InvalidHighLow {
                high: self.high,
                low: self.low,
            });
        }

        //validate close within [low, high]
        if self.close < self.low || self.close > self.high {
            return Err(BarError::InvalidClose {
                close: self.close,
                high: self.high,
                low: self.low,
            });
        }

        //validate open within [low, high]
        if self.open < self.low || self.open > self.high {
            return Err(BarError::InvalidOpen {
                open: self.open,
                high: self.high,
                low: self.low,
            });
        }

        //validate non-negative volume
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume));
        }

        Ok(())
    }

    //scales every price field by factor, volume untouched
    pub fn scaled(&self, factor: f64) -> Self {
        Bar {
            timestamp: self.timestamp,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            volume: self.volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn rejects_high_below_low() {
        let err = Bar::new(ts(), 10.0, 9.0, 11.0, 10.0, 100.0).unwrap_err();
        assert_eq!(err, BarError::InvalidHighLow { high: 9.0, low: 11.0 });
    }

    #[test]
    fn rejects_missing_price() {
        let err = Bar::new(ts(), f64::NAN, 11.0, 9.0, 10.0, 100.0).unwrap_err();
        assert_eq!(err, BarError::MissingPrice(ts()));
    }

    #[test]
    fn synthetic_flat_bar_is_valid() {
        let bar = Bar::new(ts(), 10.0, 10.0, 10.0, 10.0, 0.0).unwrap();
        assert!(bar.validate().is_ok());
        assert_eq!(bar.volume, 0.0);
    }

    #[test]
    fn scaled_keeps_volume() {
        let bar = Bar::new_unchecked(ts(), 2.0, 4.0, 1.0, 3.0, 50.0).scaled(0.5);
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (1.0, 2.0, 0.5, 1.5));
        assert_eq!(bar.volume, 50.0);
    }
}
