use crate::align::session::SessionWindow;
use crate::data::RawBar;
use crate::fetch::{AggregatesSource, DataError};
use anyhow::{Context, Result};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

//waits between requests; tests swap in a recorder
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    //delay after failed attempt n is base_delay * 2^(n-1)
    pub base_delay: Duration,
    //delay after every successful window
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            pacing: Duration::from_secs(6),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

//splits [start, end] into calendar-month windows, the first and last clipped
pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut from = start;
    while from <= end {
        let next_month = if from.month() == 12 {
            NaiveDate::from_ymd_opt(from.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(from.year(), from.month() + 1, 1)
        };
        let Some(next_month) = next_month else { break };
        let to = (next_month - ChronoDuration::days(1)).min(end);
        windows.push((from, to));
        from = next_month;
    }
    windows
}

pub struct Fetcher<S: AggregatesSource, Z: Sleeper = ThreadSleeper> {
    source: S,
    sleeper: Z,
    policy: RetryPolicy,
    session: SessionWindow,
}

impl<S: AggregatesSource> Fetcher<S, ThreadSleeper> {
    pub fn new(source: S, policy: RetryPolicy, session: SessionWindow) -> Self {
        Fetcher::with_sleeper(source, ThreadSleeper, policy, session)
    }
}

impl<S: AggregatesSource, Z: Sleeper> Fetcher<S, Z> {
    pub fn with_sleeper(source: S, sleeper: Z, policy: RetryPolicy, session: SessionWindow) -> Self {
        Fetcher {
            source,
            sleeper,
            policy,
            session,
        }
    }

    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    fn fetch_window(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.source.fetch_range(ticker, from, to) {
                Ok(bars) => {
                    tracing::debug!(ticker, %from, %to, bars = bars.len(), "window received");
                    self.sleeper.sleep(self.policy.pacing);
                    return Ok(bars);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        ticker,
                        %from,
                        %to,
                        attempt,
                        error = %e,
                        delay_secs = delay.as_secs_f64(),
                        "window request failed, retrying"
                    );
                    self.sleeper.sleep(delay);
                }
                Err(e) => {
                    return Err(DataError::RetriesExhausted {
                        ticker: ticker.to_string(),
                        from,
                        to,
                        attempts: attempt,
                        last: e.to_string(),
                    })
                }
            }
        }
    }

    //downloads every month of [start, end] and returns the session bars
    //sorted ascending; one failed window discards everything
    pub fn fetch_ticker(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let windows = month_windows(start, end);
        tracing::info!(
            ticker,
            source = self.source.name(),
            %start,
            %end,
            windows = windows.len(),
            "fetching minute bars"
        );

        let mut all = Vec::new();
        for (from, to) in windows {
            all.extend(self.fetch_window(ticker, from, to)?);
        }

        let total = all.len();
        let mut bars: Vec<RawBar> = all
            .into_iter()
            .filter(|bar| {
                self.session
                    .contains(self.session.to_local(bar.timestamp).time())
            })
            .collect();
        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        tracing::info!(ticker, received = total, kept = bars.len(), "fetch complete");
        Ok(bars)
    }

    //fetches and writes <dir>/<TICKER>.csv; nothing is written on failure
    pub fn fetch_to_csv(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        dir: &Path,
    ) -> Result<PathBuf> {
        let bars = self.fetch_ticker(ticker, start, end)?;
        let path = dir.join(format!("{}.csv", ticker.trim().to_uppercase()));
        write_raw_csv(&path, &bars)?;
        tracing::info!(ticker, path = ?path, rows = bars.len(), "saved raw bars");
        Ok(path)
    }
}

#[derive(Serialize)]
struct RawRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

//writes bars in the raw per-ticker layout, timestamps as UTC instants
pub fn write_raw_csv(path: &Path, bars: &[RawBar]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {:?}", parent))?;
        }
    }

    let mut writer =
        csv::Writer::from_path(path).context(format!("Failed to create CSV file: {:?}", path))?;
    if bars.is_empty() {
        writer.write_record(crate::data::loader::RAW_COLUMNS)?;
    }
    for bar in bars {
        writer.serialize(RawRow {
            timestamp: bar
                .timestamp
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::session::SourceTz;
    use chrono::{DateTime, TimeZone};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Sleeper for Recorder {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    //fails a fixed number of times per window, then serves one bar per window
    struct Scripted {
        failures: u32,
        calls: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl Scripted {
        fn new(failures: u32) -> Self {
            Scripted {
                failures,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl AggregatesSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_range(
            &self,
            _ticker: &str,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<RawBar>, DataError> {
            let mut calls = self.calls.borrow_mut();
            calls.push((from, to));
            let tries = calls.iter().filter(|w| **w == (from, to)).count() as u32;
            if tries <= self.failures {
                return Err(DataError::RateLimited);
            }
            //first trading minute of the window's first weekday, plus one pre-market bar
            let day = (0..7)
                .map(|i| from + ChronoDuration::days(i))
                .find(|d| d.weekday().number_from_monday() <= 5)
                .unwrap();
            let open = chrono_tz::America::New_York
                .from_local_datetime(&day.and_hms_opt(9, 30, 0).unwrap())
                .unwrap()
                .with_timezone(&Utc);
            Ok(vec![
                RawBar::new(open + ChronoDuration::minutes(1), 2.0, 2.0, 2.0, 2.0, 5.0),
                RawBar::new(open, 1.0, 1.0, 1.0, 1.0, 5.0),
                RawBar::new(open - ChronoDuration::hours(1), 9.0, 9.0, 9.0, 9.0, 5.0),
            ])
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(2),
            pacing: Duration::from_secs(6),
        }
    }

    #[test]
    fn month_windows_clip_both_ends() {
        assert_eq!(
            month_windows(d(2024, 1, 15), d(2024, 3, 10)),
            vec![
                (d(2024, 1, 15), d(2024, 1, 31)),
                (d(2024, 2, 1), d(2024, 2, 29)),
                (d(2024, 3, 1), d(2024, 3, 10)),
            ]
        );
        assert_eq!(
            month_windows(d(2023, 12, 5), d(2024, 1, 2)),
            vec![(d(2023, 12, 5), d(2023, 12, 31)), (d(2024, 1, 1), d(2024, 1, 2))]
        );
        assert!(month_windows(d(2024, 2, 1), d(2024, 1, 1)).is_empty());
    }

    #[test]
    fn backoff_doubles() {
        let p = policy();
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
        assert_eq!(p.backoff(4), Duration::from_secs(16));
    }

    #[test]
    fn retries_then_succeeds() {
        let fetcher =
            Fetcher::with_sleeper(Scripted::new(2), Recorder::default(), policy(), SessionWindow::nyse());
        let bars = fetcher.fetch_ticker("AAA", d(2024, 1, 2), d(2024, 1, 31)).unwrap();

        //pre-market bar filtered, the rest sorted
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);

        let sleeps = fetcher.sleeper().sleeps.borrow().clone();
        assert_eq!(
            sleeps,
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(6)]
        );
    }

    #[test]
    fn five_failures_are_fatal_and_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            Fetcher::with_sleeper(Scripted::new(5), Recorder::default(), policy(), SessionWindow::nyse());
        let err = fetcher
            .fetch_to_csv("AAA", d(2024, 1, 2), d(2024, 2, 28), dir.path())
            .unwrap_err();

        match err.downcast_ref::<DataError>() {
            Some(DataError::RetriesExhausted { attempts, from, .. }) => {
                assert_eq!(*attempts, 5);
                assert_eq!(*from, d(2024, 1, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!dir.path().join("AAA.csv").exists());
        //four backoff sleeps, no pacing
        assert_eq!(fetcher.sleeper().sleeps.borrow().len(), 4);
    }

    #[test]
    fn non_transient_error_stops_immediately() {
        struct Denied;
        impl AggregatesSource for Denied {
            fn name(&self) -> &str {
                "denied"
            }
            fn fetch_range(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<RawBar>, DataError> {
                Err(DataError::AuthenticationRequired("HTTP 401".into()))
            }
        }
        let fetcher =
            Fetcher::with_sleeper(Denied, Recorder::default(), policy(), SessionWindow::nyse());
        let err = fetcher.fetch_ticker("AAA", d(2024, 1, 2), d(2024, 1, 5)).unwrap_err();
        assert!(matches!(err, DataError::RetriesExhausted { attempts: 1, .. }));
    }

    #[test]
    fn written_file_reloads_as_utc() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher =
            Fetcher::with_sleeper(Scripted::new(0), Recorder::default(), policy(), SessionWindow::nyse());
        let path = fetcher
            .fetch_to_csv("aaa", d(2024, 1, 2), d(2024, 1, 31), dir.path())
            .unwrap();
        assert!(path.ends_with("AAA.csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("timestamp,open,high,low,close,volume\n2024-01-02T14:30:00Z,"));

        let loaded = crate::data::load_raw_csv(&path, SourceTz::Utc).unwrap();
        let want: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        assert_eq!(loaded[0].timestamp, want);
    }
}
