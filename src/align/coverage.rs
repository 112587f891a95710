use crate::align::finalize::CleanBar;
use crate::align::session::SessionBar;
use chrono::NaiveDate;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

//bar-count check of a cleaned file against the calendar
//advisory only: it describes the output, it never changes it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub ticker: String,
    pub trading_days: usize,
    pub bars_per_day: usize,
    pub expected_rows: usize,
    pub actual_rows: usize,
    //calendar days with no rows at all
    pub missing_days: Vec<NaiveDate>,
    //calendar days whose row count is not bars_per_day
    pub irregular_days: Vec<(NaiveDate, usize)>,
    //calendar days absent from the raw input, before any filling
    pub raw_missing_days: Vec<NaiveDate>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.expected_rows == self.actual_rows
            && self.missing_days.is_empty()
            && self.irregular_days.is_empty()
    }

    pub fn mismatch(&self) -> i64 {
        self.actual_rows as i64 - self.expected_rows as i64
    }

    pub fn log(&self) {
        if !self.raw_missing_days.is_empty() {
            tracing::info!(
                ticker = %self.ticker,
                days = self.raw_missing_days.len(),
                "trading days missing from raw input: {}",
                join_dates(&self.raw_missing_days)
            );
        }

        if self.is_complete() {
            tracing::info!(
                ticker = %self.ticker,
                rows = self.actual_rows,
                days = self.trading_days,
                "bar count matches calendar"
            );
            return;
        }

        tracing::warn!(
            ticker = %self.ticker,
            expected = self.expected_rows,
            actual = self.actual_rows,
            mismatch = self.mismatch(),
            "bar count does not match calendar"
        );
        for day in &self.missing_days {
            tracing::warn!(ticker = %self.ticker, %day, "trading day has no bars");
        }
        for (day, count) in &self.irregular_days {
            tracing::warn!(
                ticker = %self.ticker,
                %day,
                count,
                expected = self.bars_per_day,
                "trading day has irregular bar count"
            );
        }
    }

    pub fn print_table(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Ticker"),
            Cell::new("Days"),
            Cell::new("Expected"),
            Cell::new("Actual"),
            Cell::new("Missing Days"),
            Cell::new("Irregular Days"),
        ]));

        let irregular: Vec<String> = self
            .irregular_days
            .iter()
            .map(|(day, count)| format!("{} ({})", day, count))
            .collect();

        table.add_row(Row::new(vec![
            Cell::new(&self.ticker),
            Cell::new(&self.trading_days.to_string()),
            Cell::new(&self.expected_rows.to_string()),
            Cell::new(&self.actual_rows.to_string()),
            Cell::new(&join_dates(&self.missing_days)),
            Cell::new(&irregular.join(", ")),
        ]));

        table.printstd();
    }
}

fn join_dates(days: &[NaiveDate]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn check_coverage(
    ticker: &str,
    rows: &[CleanBar],
    trading_days: &[NaiveDate],
    bars_per_day: usize,
) -> CoverageReport {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.datetime.date()).or_insert(0) += 1;
    }

    let mut missing_days = Vec::new();
    let mut irregular_days = Vec::new();
    for day in trading_days {
        match counts.get(day).copied().unwrap_or(0) {
            0 => missing_days.push(*day),
            n if n != bars_per_day => irregular_days.push((*day, n)),
            _ => {}
        }
    }

    CoverageReport {
        ticker: ticker.to_string(),
        trading_days: trading_days.len(),
        bars_per_day,
        expected_rows: trading_days.len() * bars_per_day,
        actual_rows: rows.len(),
        missing_days,
        irregular_days,
        raw_missing_days: Vec::new(),
    }
}

//calendar days with no session bar in the raw input
pub fn raw_missing_days(bars: &[SessionBar], trading_days: &[NaiveDate]) -> Vec<NaiveDate> {
    let present: BTreeSet<NaiveDate> = bars.iter().map(|b| b.date()).collect();
    trading_days
        .iter()
        .filter(|d| !present.contains(d))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{NyseCalendar, TradingCalendar};
    use chrono::{Duration, TimeZone};

    fn rows_for(days: &[NaiveDate], per_day: &[usize]) -> Vec<CleanBar> {
        let mut rows = Vec::new();
        for (day, count) in days.iter().zip(per_day) {
            let open = day.and_hms_opt(9, 30, 0).unwrap();
            for m in 0..*count {
                rows.push(CleanBar {
                    datetime: open + Duration::minutes(m as i64),
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 0.0,
                });
            }
        }
        rows
    }

    fn january() -> Vec<NaiveDate> {
        NyseCalendar::new()
            .trading_days(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn one_short_day_is_reported() {
        let days = january();
        assert_eq!(days.len(), 21);
        let mut counts = vec![390; 21];
        counts[7] = 389;
        let rows = rows_for(&days, &counts);

        let report = check_coverage("AAA", &rows, &days, 390);
        assert_eq!(report.expected_rows, 8190);
        assert_eq!(report.actual_rows, 8189);
        assert_eq!(report.mismatch(), -1);
        assert!(!report.is_complete());
        assert!(report.missing_days.is_empty());
        assert_eq!(report.irregular_days, vec![(days[7], 389)]);
    }

    #[test]
    fn complete_output_and_missing_day() {
        let days = january();
        let full = rows_for(&days, &[390; 21]);
        assert!(check_coverage("AAA", &full, &days, 390).is_complete());

        let mut counts = vec![390; 21];
        counts[0] = 0;
        let rows = rows_for(&days, &counts);
        let report = check_coverage("AAA", &rows, &days, 390);
        assert_eq!(report.missing_days, vec![days[0]]);
    }

    #[test]
    fn raw_missing_days_lists_absent_dates() {
        let days = &january()[..3];
        let ts = chrono_tz::America::New_York
            .with_ymd_and_hms(2024, 1, 3, 10, 0, 0)
            .unwrap();
        let bars = vec![SessionBar {
            timestamp: ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        }];
        assert_eq!(raw_missing_days(&bars, days), vec![days[0], days[2]]);
    }
}
