use crate::data::Bar;
use chrono::{Duration, NaiveDateTime};

//aggregates bars into n-minute buckets counted from midnight of the first bar's day
//open first, high max, low min, close last, volume sum; empty buckets do not appear
pub fn resample(bars: &[Bar], minutes: u32) -> Vec<Bar> {
    if minutes <= 1 || bars.is_empty() {
        return bars.to_vec();
    }

    let width = i64::from(minutes) * 60;
    let origin = bars[0].timestamp.date().and_time(chrono::NaiveTime::MIN);
    let bucket_of = |ts: NaiveDateTime| -> NaiveDateTime {
        let offset = (ts - origin).num_seconds();
        origin + Duration::seconds(offset.div_euclid(width) * width)
    };

    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let bucket = bucket_of(bar.timestamp);
        match out.last_mut() {
            Some(current) if current.timestamp == bucket => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(Bar::new_unchecked(
                bucket, bar.open, bar.high, bar.low, bar.close, bar.volume,
            )),
        }
    }
    out
}
