//exchange trading-day calendars
//`calendar_for` maps an exchange code to built-in rules, `FixedCalendar` serves an explicit list

pub mod nyse;

pub use nyse::NyseCalendar;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CalendarError {
    #[error("unknown exchange code: {0}")]
    UnknownExchange(String),
}

pub trait TradingCalendar: Send + Sync {
    fn name(&self) -> &str;

    fn is_trading_day(&self, date: NaiveDate) -> bool;

    //sessions in `[start, end]`, ascending. Empty when `start > end`
    fn trading_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CalendarError> {
        let mut days = Vec::new();
        let mut day = start;
        while day <= end {
            if self.is_trading_day(day) {
                days.push(day);
            }
            day += Duration::days(1);
        }
        Ok(days)
    }

    fn count(&self, start: NaiveDate, end: NaiveDate) -> Result<usize, CalendarError> {
        Ok(self.trading_days(start, end)?.len())
    }
}

//resolve an exchange code to its calendar
pub fn calendar_for(code: &str) -> Result<Box<dyn TradingCalendar>, CalendarError> {
    match code.trim().to_uppercase().as_str() {
        "XNYS" | "NYSE" | "XNAS" | "NASDAQ" => Ok(Box::new(NyseCalendar::new())),
        _ => Err(CalendarError::UnknownExchange(code.to_string())),
    }
}

//a calendar backed by an explicit list of session dates
#[derive(Debug, Clone, Default)]
pub struct FixedCalendar {
    name: String,
    days: Vec<NaiveDate>,
}

impl FixedCalendar {
    pub fn new(name: impl Into<String>, mut days: Vec<NaiveDate>) -> Self {
        days.sort();
        days.dedup();
        FixedCalendar {
            name: name.into(),
            days,
        }
    }

    //one `YYYY-MM-DD` per line; a header line, blank lines and `#` comments
    //are skipped. Only the first comma-separated field is read
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calendar file {:?}", path))?;
        let mut days = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let field = line.split(',').next().unwrap_or("").trim();
            if field.is_empty() || field.starts_with('#') {
                continue;
            }
            match NaiveDate::parse_from_str(field, "%Y-%m-%d") {
                Ok(day) => days.push(day),
                Err(_) if index == 0 => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Bad date '{}' at line {} of {:?}", field, index + 1, path)
                    })
                }
            }
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fixed".to_string());
        Ok(FixedCalendar::new(name, days))
    }
}

impl TradingCalendar for FixedCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.days.binary_search(&date).is_ok()
    }

    fn trading_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, CalendarError> {
        Ok(self
            .days
            .iter()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn resolves_known_codes() {
        assert_eq!(calendar_for("XNYS").unwrap().name(), "XNYS");
        assert_eq!(calendar_for("nasdaq").unwrap().name(), "XNYS");
        assert_eq!(
            calendar_for("XLON").err(),
            Some(CalendarError::UnknownExchange("XLON".into()))
        );
    }

    #[test]
    fn january_2024_has_21_sessions() {
        let cal = calendar_for("XNYS").unwrap();
        let days = cal.trading_days(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert_eq!(days.len(), 21);
        assert_eq!(days.first(), Some(&d(2024, 1, 2)));
        assert!(!days.contains(&d(2024, 1, 15)));
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn inverted_span_is_empty() {
        let cal = NyseCalendar::new();
        assert!(cal.trading_days(d(2024, 2, 1), d(2024, 1, 1)).unwrap().is_empty());
    }

    #[test]
    fn fixed_calendar_filters_span() {
        let cal = FixedCalendar::new(
            "test",
            vec![d(2024, 1, 5), d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 3)],
        );
        assert_eq!(
            cal.trading_days(d(2024, 1, 3), d(2024, 1, 31)).unwrap(),
            vec![d(2024, 1, 3), d(2024, 1, 5)]
        );
        assert_eq!(cal.count(d(2024, 1, 1), d(2024, 1, 31)).unwrap(), 3);
    }

    #[test]
    fn fixed_calendar_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.csv");
        std::fs::write(&path, "date\n2024-01-02\n# comment\n\n2024-01-03,extra\n").unwrap();
        let cal = FixedCalendar::from_file(&path).unwrap();
        assert_eq!(cal.name(), "sessions");
        assert_eq!(
            cal.trading_days(d(2024, 1, 1), d(2024, 1, 31)).unwrap(),
            vec![d(2024, 1, 2), d(2024, 1, 3)]
        );
    }
}
