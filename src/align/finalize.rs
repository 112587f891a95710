use crate::align::gap_fill::GridBar;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

//what to do with whole days that precede the first known price of a series
//a partly observed first day is already filled from its own first close by the gap filler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnseededPolicy {
    //drop them, nothing is ever taken from a later bar
    #[default]
    Drop,
    //fill them backward from the first known value
    Backfill,
}

impl UnseededPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "drop" => Some(UnseededPolicy::Drop),
            "backfill" | "bfill" => Some(UnseededPolicy::Backfill),
            _ => None,
        }
    }
}

mod datetime_format {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(DATETIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

//a row of the cleaned per-ticker file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanBar {
    #[serde(rename = "Datetime", with = "datetime_format")]
    pub datetime: NaiveDateTime,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: f64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    datetime: NaiveDateTime,
    prices: [Option<f64>; 4],
    volume: f64,
}

//turns the filled grid into the external schema
//forward fill per column, optional backward fill, then drop what is still empty
pub fn finalize(rows: &[GridBar], policy: UnseededPolicy) -> Vec<CleanBar> {
    let mut slots: Vec<Slot> = rows
        .iter()
        .map(|r| Slot {
            datetime: r.timestamp.naive_local(),
            prices: [r.open, r.high, r.low, r.close],
            volume: if r.volume.is_nan() { 0.0 } else { r.volume },
        })
        .collect();

    let mut last = [None; 4];
    for slot in slots.iter_mut() {
        for (price, carried) in slot.prices.iter_mut().zip(last.iter_mut()) {
            match price {
                Some(p) => *carried = Some(*p),
                None => *price = *carried,
            }
        }
    }

    if policy == UnseededPolicy::Backfill {
        let mut next = [None; 4];
        for slot in slots.iter_mut().rev() {
            for (price, carried) in slot.prices.iter_mut().zip(next.iter_mut()) {
                match price {
                    Some(p) => *carried = Some(*p),
                    None => *price = *carried,
                }
            }
        }
    }

    let clean: Vec<CleanBar> = slots
        .iter()
        .filter_map(|slot| match slot.prices {
            [Some(open), Some(high), Some(low), Some(close)] => Some(CleanBar {
                datetime: slot.datetime,
                open,
                high,
                low,
                close,
                volume: slot.volume,
            }),
            _ => None,
        })
        .collect();

    let dropped = rows.len() - clean.len();
    if dropped > 0 {
        tracing::debug!(dropped, ?policy, "dropped rows without a known price");
    }
    clean
}

//writes cleaned rows, creating the parent directory when needed
pub fn write_clean_csv<P: AsRef<Path>>(path: P, rows: &[CleanBar]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory {:?}", parent))?;
        }
    }

    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create CSV file: {:?}", path))?;
    if rows.is_empty() {
        writer.write_record(["Datetime", "Open", "High", "Low", "Close", "Volume"])?;
    }
    for row in rows {
        writer
            .serialize(row)
            .context(format!("Failed to write row {} to {:?}", row.datetime, path))?;
    }
    writer.flush()?;
    Ok(())
}
