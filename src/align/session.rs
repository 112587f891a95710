//regular-session window and timezone normalization
//raw bars move to the exchange-local clock and survive only inside the window, both ends inclusive

use crate::data::RawBar;
use anyhow::Context;
use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("session last bar {last_bar} is before session open {open}")]
    Inverted { open: NaiveTime, last_bar: NaiveTime },
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

//parse an IANA zone name such as `America/New_York`
pub fn parse_timezone(name: &str) -> Result<Tz, SessionError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SessionError::UnknownTimezone(name.to_string()))
}

//resolve a local wall-clock time to an instant
//fall-back ambiguity picks the earlier instant; a spring-forward gap moves
//forward minute by minute to the first valid local time (at most two hours)
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let mut t = naive;
            for _ in 0..120 {
                t += Duration::minutes(1);
                if let LocalResult::Single(dt) = tz.from_local_datetime(&t) {
                    return Some(dt);
                }
            }
            None
        }
    }
}

//how naive timestamps in a raw file are to be read
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SourceTz {
    //naive timestamps are UTC instants
    #[default]
    Utc,
    //naive timestamps are wall-clock times in this zone
    Zone(Tz),
}

impl SourceTz {
    pub fn parse(hint: &str) -> Result<Self, SessionError> {
        if hint.trim().eq_ignore_ascii_case("utc") {
            Ok(SourceTz::Utc)
        } else {
            parse_timezone(hint).map(SourceTz::Zone)
        }
    }

    //reinterpret (not shift) a naive timestamp in this zone
    pub fn interpret(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            SourceTz::Utc => Some(naive.and_utc()),
            SourceTz::Zone(tz) => localize(naive, *tz).map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

//the regular trading session of one exchange
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionWindow {
    open: NaiveTime,
    last_bar: NaiveTime,
    tz: Tz,
}

impl SessionWindow {
    pub fn new(open: NaiveTime, last_bar: NaiveTime, tz: Tz) -> Result<Self, SessionError> {
        if last_bar < open {
            return Err(SessionError::Inverted { open, last_bar });
        }
        Ok(SessionWindow { open, last_bar, tz })
    }

    //09:30–15:59 America/New_York
    pub fn nyse() -> Self {
        SessionWindow {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            last_bar: NaiveTime::from_hms_opt(15, 59, 0).unwrap_or_default(),
            tz: chrono_tz::America::New_York,
        }
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn last_bar(&self) -> NaiveTime {
        self.last_bar
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    //one-minute bars per full session; 390 for the NYSE default
    pub fn bars_per_day(&self) -> usize {
        ((self.last_bar - self.open).num_minutes() + 1) as usize
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time <= self.last_bar
    }

    //first instant of the session on `day`
    pub fn session_start(&self, day: NaiveDate) -> Option<DateTime<Tz>> {
        localize(day.and_time(self.open), self.tz)
    }

    //the canonical one-minute grid for `day`, open through last bar
    //wall-clock minutes that do not exist locally are left out
    pub fn grid(&self, day: NaiveDate) -> Vec<DateTime<Tz>> {
        let start = day.and_time(self.open);
        (0..self.bars_per_day() as i64)
            .filter_map(|m| {
                match self
                    .tz
                    .from_local_datetime(&(start + Duration::minutes(m)))
                {
                    LocalResult::Single(dt) => Some(dt),
                    LocalResult::Ambiguous(earliest, _) => Some(earliest),
                    LocalResult::None => None,
                }
            })
            .collect()
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        SessionWindow::nyse()
    }
}

//a raw bar on the exchange-local clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionBar {
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl SessionBar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn has_close(&self) -> bool {
        !self.close.is_nan()
    }
}

//convert raw bars to the session clock, drop everything outside the
//window and sort ascending
pub fn normalize(raw: &[RawBar], session: &SessionWindow) -> Vec<SessionBar> {
    let mut bars: Vec<SessionBar> = raw
        .iter()
        .map(|bar| SessionBar {
            timestamp: session.to_local(bar.timestamp),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })
        .filter(|bar| session.contains(bar.timestamp.time()))
        .collect();

    //stable, so duplicate timestamps keep their input order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let dropped = raw.len() - bars.len();
    if dropped > 0 {
        tracing::debug!(dropped, kept = bars.len(), "dropped out-of-session bars");
    }
    bars
}

//load a raw per-ticker file and normalize it onto the session clock
pub fn load_session_bars(
    path: &std::path::Path,
    source_tz: SourceTz,
    session: &SessionWindow,
) -> anyhow::Result<Vec<SessionBar>> {
    let raw = crate::data::load_raw_csv(path, source_tz)
        .with_context(|| format!("Failed to load raw bars from {:?}", path))?;
    Ok(normalize(&raw, session))
}
