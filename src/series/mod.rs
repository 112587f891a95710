//preparing cleaned bars for a run: symbol resolution, resampling,
//universe stitching and date windows

pub mod resample;
pub mod stitch;
pub mod universe;
pub mod window;

pub use resample::resample;
pub use stitch::stitch;
pub use universe::{ResolvedSymbol, Universes};
pub use window::{DateWindow, Span};

use crate::config::{ConfigError, RunConfiguration};
use crate::data::{load_clean_csv, Bar};
use anyhow::{bail, Context, Result};
use std::path::Path;

//bars selected for one run and a label describing them
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub label: String,
    pub bars: Vec<Bar>,
}

//load `<dir>/<TICKER>.csv` and resample it to `timeframe` minutes
pub fn load_ticker(data_dir: &Path, ticker: &str, timeframe: u32) -> Result<Vec<Bar>> {
    let path = data_dir.join(format!("{}.csv", ticker));
    if !path.exists() {
        bail!(
            "CSV not found: {:?}. Place '{}.csv' under {:?} (run `barsmith align` first).",
            path,
            ticker,
            data_dir
        );
    }
    let bars = load_clean_csv(&path).context(format!("Failed to load {}", ticker))?;
    Ok(resample(&bars, timeframe))
}

//resolve the configured symbol and build the bar series for a run
//a stitched universe always covers its full span; a single ticker is cut
//to the configured start month and duration
pub fn prepare_series(config: &RunConfiguration) -> Result<PreparedSeries> {
    if config.timeframe == 0 {
        return Err(ConfigError::InvalidTimeframe(config.timeframe).into());
    }
    let resolved = config.universes.resolve(&config.symbol)?;

    if config.stitch {
        if let Some(prefix) = &resolved.universe {
            let tickers = config.universes.get(prefix).unwrap_or_default();
            tracing::info!(universe = %prefix, tickers = %tickers.join(", "), "stitching universe");

            let mut segments = Vec::with_capacity(tickers.len());
            for ticker in tickers {
                segments.push((ticker.clone(), load_ticker(&config.data_dir, ticker, config.timeframe)?));
            }
            let bars = stitch(&segments, config.timeframe)
                .context(format!("Universe '{}' has no data", prefix))?;
            return Ok(PreparedSeries {
                label: format!("{}-universe stitched ({}-min)", prefix.to_uppercase(), config.timeframe),
                bars,
            });
        }
        tracing::warn!(symbol = %config.symbol, "stitching requested for a raw ticker, ignored");
    }

    let bars = load_ticker(&config.data_dir, &resolved.ticker, config.timeframe)?;
    let bars = match config.window()? {
        Some(window) => window.apply(&bars).to_vec(),
        None => bars,
    };

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        tracing::info!(
            ticker = %resolved.ticker,
            from = %first.timestamp,
            to = %last.timestamp,
            bars = bars.len(),
            "test range"
        );
    }

    Ok(PreparedSeries {
        label: format!("{} ({}-min)", resolved.ticker, config.timeframe),
        bars,
    })
}
