use crate::config::ConfigError;
use crate::data::Bar;
use chrono::{Duration, Months, NaiveDate, NaiveDateTime};

//length of a test window: "10D", "2W", "1M", "1Y"; a bare number means months
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl Span {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let s = s.trim().to_uppercase();
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        let unit: String = s.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        let n: u32 = digits
            .parse()
            .map_err(|_| ConfigError::InvalidDuration(s.clone()))?;

        match unit.as_str() {
            "D" => Ok(Span::Days(n)),
            "W" => Ok(Span::Weeks(n)),
            "" | "M" => Ok(Span::Months(n)),
            "Y" => Ok(Span::Years(n)),
            _ => Err(ConfigError::InvalidDuration(s)),
        }
    }

    pub fn add_to(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            Span::Days(n) => start.checked_add_signed(Duration::days(i64::from(n))),
            Span::Weeks(n) => start.checked_add_signed(Duration::weeks(i64::from(n))),
            Span::Months(n) => start.checked_add_months(Months::new(n)),
            Span::Years(n) => start.checked_add_months(Months::new(n.saturating_mul(12))),
        }
    }
}

//the [start, end] range selected for a run, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    //start at the first of year/month, run for span; no span keeps the data's end
    pub fn from_start(year: i32, month: u32, span: Option<Span>) -> Result<Self, ConfigError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
            .ok_or_else(|| ConfigError::InvalidDuration(format!("{:04}-{:02}", year, month)))?;
        let end = match span {
            Some(span) => span
                .add_to(start)
                .ok_or_else(|| ConfigError::InvalidDuration(format!("{:?}", span)))?,
            None => NaiveDateTime::MAX,
        };
        Ok(DateWindow { start, end })
    }

    //slice of bars inside the window after clamping it to the data's own span
    pub fn apply<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return bars;
        };
        let start = self.start.max(first.timestamp);
        let end = self.end.min(last.timestamp);
        let lo = bars.partition_point(|b| b.timestamp < start);
        let hi = bars.partition_point(|b| b.timestamp <= end);
        if lo >= hi {
            return &bars[0..0];
        }
        &bars[lo..hi]
    }
}
