use crate::align::session::SourceTz;
use crate::data::bar::{Bar, RawBar};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;
use std::path::Path;

pub const RAW_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

#[derive(Debug, Deserialize)]
struct RawRecord {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

//parses a timestamp cell into an instant
//strings with an offset are instants as-is, naive strings are read in source_tz,
//all-digit strings are epoch milliseconds
pub fn parse_timestamp(raw: &str, source_tz: SourceTz) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    parse_naive(s).and_then(|naive| source_tz.interpret(naive))
}

//parses a wall-clock timestamp, dropping any trailing offset
pub fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive);
        }
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.naive_local());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_local())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn require_columns(headers: &StringRecord, required: &[&str], path: &Path) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            bail!("{:?} is missing required column '{}'", path, column);
        }
    }
    Ok(())
}

//loads vendor bars from a raw per-ticker csv
//a missing timestamp or ohlcv column is fatal, as is an unreadable timestamp
pub fn load_raw_csv<P: AsRef<Path>>(path: P, source_tz: SourceTz) -> Result<Vec<RawBar>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let headers = reader
        .headers()
        .context(format!("Failed to read CSV header of {:?}", path))?
        .clone();
    require_columns(&headers, &RAW_COLUMNS, path)?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: RawRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;

        let timestamp = parse_timestamp(&record.timestamp, source_tz).with_context(|| {
            format!(
                "Failed to parse timestamp '{}' at line {}",
                record.timestamp,
                index + 2
            )
        })?;

        bars.push(RawBar::new(
            timestamp,
            record.open.unwrap_or(f64::NAN),
            record.high.unwrap_or(f64::NAN),
            record.low.unwrap_or(f64::NAN),
            record.close.unwrap_or(f64::NAN),
            record.volume.unwrap_or(f64::NAN),
        ));
    }

    tracing::debug!(path = ?path, rows = bars.len(), "loaded raw bars");
    Ok(bars)
}

//loads cleaned bars (Datetime/Date plus case-insensitive ohlcv)
pub fn load_clean_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let headers = reader
        .headers()
        .context(format!("Failed to read CSV header of {:?}", path))?
        .clone();

    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let time_col = match headers.iter().position(|h| h == "Datetime") {
        Some(i) => i,
        None => headers
            .iter()
            .position(|h| h == "Date")
            .context(format!("{:?}: expected a 'Datetime' or 'Date' column", path))?,
    };

    let mut cols = [0usize; 5];
    for (slot, name) in cols.iter_mut().zip(["open", "high", "low", "close", "volume"]) {
        *slot = find(name).context(format!("{:?} is missing required column '{}'", path, name))?;
    }

    let mut bars = Vec::new();
    let mut invalid = 0usize;

    for (index, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to parse CSV record at line {}", index + 2))?;
        let line = index + 2;

        let cell = |i: usize| record.get(i).unwrap_or("");
        let timestamp = parse_naive(cell(time_col)).with_context(|| {
            format!(
                "Failed to parse timestamp '{}' at line {}",
                cell(time_col),
                line
            )
        })?;

        let mut values = [0.0f64; 5];
        for (value, &col) in values.iter_mut().zip(cols.iter()) {
            let text = cell(col);
            *value = if text.is_empty() {
                f64::NAN
            } else {
                text.parse::<f64>().with_context(|| {
                    format!("Failed to parse number '{}' at line {}", text, line)
                })?
            };
        }

        let bar = Bar::new_unchecked(
            timestamp, values[0], values[1], values[2], values[3], values[4],
        );
        if bar.validate().is_err() {
            invalid += 1;
        }
        bars.push(bar);
    }

    if invalid > 0 {
        tracing::warn!(path = ?path, invalid, "bars violate OHLC invariants");
    }

    //sort by timestamp to ensure chronological order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    Ok(bars)
}
