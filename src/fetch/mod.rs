//minute-aggregate download from the market-data vendor
//`AggregatesSource` is the vendor seam under the month-by-month retry driver in `fetcher`

pub mod fetcher;
pub mod polygon;

pub use fetcher::{month_windows, write_raw_csv, Fetcher, RetryPolicy, Sleeper, ThreadSleeper};
pub use polygon::PolygonClient;

use crate::data::RawBar;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("HTTP {status} for {ticker}")]
    Http { status: u16, ticker: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("{ticker}: {attempts} attempts failed for {from}..{to}, last error: {last}")]
    RetriesExhausted {
        ticker: String,
        from: NaiveDate,
        to: NaiveDate,
        attempts: u32,
        last: String,
    },
}

impl DataError {
    //whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_) | DataError::RateLimited | DataError::Http { .. }
        )
    }
}

//a vendor of one-minute aggregates
pub trait AggregatesSource {
    fn name(&self) -> &str;

    //all minute bars of `ticker` in `[from, to]` (dates inclusive), every
    //page of the response included
    fn fetch_range(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError>;
}
