use crate::data::Bar;
use anyhow::{bail, Result};
use chrono::Duration;

//chains segments into one continuous series
//each segment after the first is scaled so its first close meets the previous last close,
//then every bar is retimed onto a gapless clock of `minutes` spacing
pub fn stitch(segments: &[(String, Vec<Bar>)], minutes: u32) -> Result<Vec<Bar>> {
    let step = Duration::minutes(i64::from(minutes.max(1)));
    let mut out: Vec<Bar> = Vec::new();
    let mut next_time = None;
    let mut scale_to: Option<f64> = None;

    for (ticker, segment) in segments {
        let Some(first) = segment.first() else {
            tracing::warn!(ticker = %ticker, "empty segment skipped");
            continue;
        };

        let mut clock = next_time.unwrap_or(first.timestamp);
        let factor = match scale_to {
            Some(target) if first.close.is_finite() && first.close != 0.0 => target / first.close,
            _ => 1.0,
        };

        for bar in segment {
            let mut scaled = bar.scaled(factor);
            scaled.timestamp = clock;
            out.push(scaled);
            clock += step;
        }

        next_time = Some(clock);
        scale_to = out.last().map(|b| b.close);
        tracing::info!(
            ticker = %ticker,
            bars = segment.len(),
            factor,
            end_close = scale_to.unwrap_or(f64::NAN),
            "stitched segment"
        );
    }

    if out.is_empty() {
        bail!("No data found to stitch");
    }
    Ok(out)
}
