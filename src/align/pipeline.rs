use crate::align::coverage::{check_coverage, raw_missing_days, CoverageReport};
use crate::align::finalize::{finalize, write_clean_csv};
use crate::align::gap_fill::fill_missing_minutes;
use crate::align::session::load_session_bars;
use crate::calendar::TradingCalendar;
use crate::config::AlignConfig;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

//what one aligner run produced
#[derive(Debug, Clone)]
pub struct AlignOutcome {
    pub ticker: String,
    pub rows_written: usize,
    pub output_path: PathBuf,
    pub report: CoverageReport,
}

pub fn ticker_file(dir: &Path, ticker: &str) -> PathBuf {
    dir.join(format!("{}.csv", ticker.trim().to_uppercase()))
}

//aligns one ticker's raw file onto the calendar grid and writes the cleaned file
//the coverage report is advisory, the file is written either way
pub fn align_ticker(
    input_dir: &Path,
    output_dir: &Path,
    ticker: &str,
    config: &AlignConfig,
    calendar: &dyn TradingCalendar,
) -> Result<AlignOutcome> {
    let ticker = ticker.trim().to_uppercase();
    let input = ticker_file(input_dir, &ticker);
    if !input.exists() {
        bail!("Raw file for {} not found at {:?}", ticker, input);
    }

    let session = config.session()?;
    let source_tz = config.source_tz()?;

    let bars = load_session_bars(&input, source_tz, &session)?;
    tracing::info!(ticker = %ticker, bars = bars.len(), "loaded session bars");

    let start = match config.start.or_else(|| bars.first().map(|b| b.date())) {
        Some(day) => day,
        None => bail!("{} has no bars and no start date was configured", ticker),
    };
    let end = match config.end.or_else(|| bars.last().map(|b| b.date())) {
        Some(day) => day,
        None => bail!("{} has no bars and no end date was configured", ticker),
    };

    let trading_days = calendar
        .trading_days(start, end)
        .context(format!("Failed to resolve {} calendar", calendar.name()))?;
    tracing::info!(
        ticker = %ticker,
        %start,
        %end,
        days = trading_days.len(),
        calendar = calendar.name(),
        "resolved trading days"
    );

    let absent = raw_missing_days(&bars, &trading_days);

    let grid = fill_missing_minutes(&bars, &trading_days, &session, config.seed_close);
    let clean = finalize(&grid, config.unseeded);

    let output_path = ticker_file(output_dir, &ticker);
    write_clean_csv(&output_path, &clean)?;
    tracing::info!(ticker = %ticker, rows = clean.len(), path = ?output_path, "wrote cleaned bars");

    let mut report = check_coverage(&ticker, &clean, &trading_days, session.bars_per_day());
    report.raw_missing_days = absent;
    report.log();

    Ok(AlignOutcome {
        ticker,
        rows_written: clean.len(),
        output_path,
        report,
    })
}

//tickers with a <TICKER>.csv in dir, sorted
pub fn discover_tickers(dir: &Path) -> Result<Vec<String>> {
    let mut tickers = Vec::new();
    for entry in std::fs::read_dir(dir).context(format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if !is_csv {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            tickers.push(stem.to_uppercase());
        }
    }
    tickers.sort();
    Ok(tickers)
}
