use anyhow::{bail, Context, Result};
use barsmith::align::discover_tickers;
use barsmith::prelude::*;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barsmith")]
#[command(about = "Fetch, calendar-align and backtest minute bars", long_about = None)]
struct Cli {
    //log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //download raw minute aggregates
    Fetch {
        //pipeline configuration (json)
        #[arg(long)]
        config: Option<PathBuf>,

        //tickers to fetch, comma separated
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,

        //first day (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        //last day, defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,

        //raw csv directory
        #[arg(long)]
        raw_dir: Option<PathBuf>,
    },

    //align raw bars onto the trading calendar and fill missing minutes
    Align {
        //pipeline configuration (json)
        #[arg(long)]
        config: Option<PathBuf>,

        //tickers to align, every raw file when omitted
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,

        #[arg(long)]
        raw_dir: Option<PathBuf>,

        #[arg(long)]
        clean_dir: Option<PathBuf>,

        //exchange code (eg XNYS)
        #[arg(long)]
        exchange: Option<String>,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        //price for empty days before the first known close
        #[arg(long)]
        seed_close: Option<f64>,

        //rows still without a price: drop or backfill
        #[arg(long)]
        unseeded: Option<String>,

        //print the coverage table of every ticker
        #[arg(long)]
        report: bool,
    },

    //backtest strategies on cleaned bars
    Run {
        //run configuration (json)
        #[arg(long)]
        config: Option<PathBuf>,

        //universe member (eg l1) or raw ticker
        #[arg(long)]
        symbol: Option<String>,

        //bar size in minutes
        #[arg(long)]
        timeframe: Option<u32>,

        #[arg(long)]
        start_year: Option<i32>,

        #[arg(long)]
        start_month: Option<u32>,

        //window length (eg 1M, 2W, 10D, 1Y)
        #[arg(long)]
        duration: Option<String>,

        //chain the whole universe of the symbol
        #[arg(long)]
        stitch: bool,

        //cleaned csv directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        //strategies to run, comma separated, or "all"
        #[arg(long, value_delimiter = ',')]
        strategy: Vec<String>,

        //initial cash
        #[arg(long)]
        cash: Option<f64>,

        //proportional commission per fill (eg 0.001)
        #[arg(long)]
        commission: Option<f64>,

        //fill at the next bar's open instead of the signal bar's close
        #[arg(long)]
        next_open: bool,

        //directory for equity and trades csv files
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    //write default configuration files
    Init {
        #[arg(long)]
        pipeline: Option<PathBuf>,

        #[arg(long)]
        run: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_pipeline(path: Option<PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_json_file(&path),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Fetch {
            config,
            tickers,
            start,
            end,
            raw_dir,
        } => {
            let mut config = load_pipeline(config)?;
            if !tickers.is_empty() {
                config.tickers = tickers;
            }
            if start.is_some() {
                config.fetch.start = start;
            }
            if end.is_some() {
                config.fetch.end = end;
            }
            if let Some(dir) = raw_dir {
                config.raw_dir = dir;
            }
            run_fetch(&config)?;
        }
        Commands::Align {
            config,
            tickers,
            raw_dir,
            clean_dir,
            exchange,
            start,
            end,
            seed_close,
            unseeded,
            report,
        } => {
            let mut config = load_pipeline(config)?;
            if !tickers.is_empty() {
                config.tickers = tickers;
            }
            if let Some(dir) = raw_dir {
                config.raw_dir = dir;
            }
            if let Some(dir) = clean_dir {
                config.clean_dir = dir;
            }
            if let Some(exchange) = exchange {
                config.align.exchange = exchange;
            }
            if start.is_some() {
                config.align.start = start;
            }
            if end.is_some() {
                config.align.end = end;
            }
            if seed_close.is_some() {
                config.align.seed_close = seed_close;
            }
            if let Some(policy) = unseeded {
                config.align.unseeded = UnseededPolicy::parse(&policy)
                    .ok_or_else(|| anyhow::anyhow!("Unknown unseeded policy: {}", policy))?;
            }
            run_align(&config, report)?;
        }
        Commands::Run {
            config,
            symbol,
            timeframe,
            start_year,
            start_month,
            duration,
            stitch,
            data_dir,
            strategy,
            cash,
            commission,
            next_open,
            output_dir,
        } => {
            let mut config = match config {
                Some(path) => RunConfiguration::from_json_file(&path)?,
                None => RunConfiguration::default(),
            };
            if let Some(symbol) = symbol {
                config.symbol = symbol;
            }
            if let Some(timeframe) = timeframe {
                config.timeframe = timeframe;
            }
            if start_year.is_some() {
                config.start_year = start_year;
            }
            if let Some(month) = start_month {
                config.start_month = month;
            }
            if duration.is_some() {
                config.duration = duration;
            }
            if stitch {
                config.stitch = true;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if strategy.iter().any(|s| s.eq_ignore_ascii_case("all")) {
                config.strategies = StrategySpec::all();
            } else if !strategy.is_empty() {
                config.strategies = strategy
                    .iter()
                    .map(|s| StrategySpec::parse(s))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            if let Some(cash) = cash {
                config.engine.cash = cash;
            }
            if let Some(rate) = commission {
                config.engine.commission.rate = rate;
            }
            if next_open {
                config.engine.trade_on_close = false;
            }
            if output_dir.is_some() {
                config.outputs.output_dir = output_dir;
            }
            run_backtests(&config)?;
        }
        Commands::Init { pipeline, run } => {
            if pipeline.is_none() && run.is_none() {
                bail!("Nothing to write: pass --pipeline and/or --run");
            }
            if let Some(path) = pipeline {
                PipelineConfig::default().to_json_file(&path)?;
                println!("Pipeline config written to {:?}", path);
            }
            if let Some(path) = run {
                let config = RunConfiguration {
                    strategies: StrategySpec::all(),
                    ..RunConfiguration::default()
                };
                config.to_json_file(&path)?;
                println!("Run config written to {:?}", path);
            }
        }
    }

    Ok(())
}

fn run_fetch(config: &PipelineConfig) -> Result<()> {
    if config.tickers.is_empty() {
        bail!("No tickers to fetch: pass --tickers or set \"tickers\" in the config");
    }
    let start = config
        .fetch
        .start
        .context("No start date: pass --start or set fetch.start")?;
    let end = config.fetch.end.unwrap_or_else(|| Utc::now().date_naive());
    if end < start {
        bail!("End date {} is before start date {}", end, start);
    }

    let client = PolygonClient::new(
        &config.fetch.base_url,
        config.fetch.api_key()?,
        config.fetch.timeout(),
    )?;
    let policy = RetryPolicy {
        max_attempts: config.fetch.max_attempts.max(1),
        base_delay: config.fetch.retry_base_delay(),
        pacing: config.fetch.pacing(),
    };
    let fetcher = Fetcher::new(client, policy, config.align.session()?);

    println!("Fetching {} ticker(s) from {} to {}", config.tickers.len(), start, end);
    for ticker in &config.tickers {
        let path = fetcher
            .fetch_to_csv(ticker, start, end, &config.raw_dir)
            .context(format!("Failed to fetch {}", ticker))?;
        println!("Saved {} to {:?}", ticker.to_uppercase(), path);
    }
    Ok(())
}

fn run_align(config: &PipelineConfig, print_report: bool) -> Result<()> {
    let tickers = if config.tickers.is_empty() {
        discover_tickers(&config.raw_dir)?
    } else {
        config.tickers.clone()
    };
    if tickers.is_empty() {
        bail!("No raw files found in {:?}", config.raw_dir);
    }
    let calendar = config.align.calendar()?;

    let mut failed = Vec::new();
    for ticker in &tickers {
        match align_ticker(
            &config.raw_dir,
            &config.clean_dir,
            ticker,
            &config.align,
            calendar.as_ref(),
        ) {
            Ok(outcome) => {
                let status = if outcome.report.is_complete() {
                    "complete".to_string()
                } else {
                    format!("mismatch {:+}", outcome.report.mismatch())
                };
                println!(
                    "{}: {} rows -> {:?} ({})",
                    outcome.ticker, outcome.rows_written, outcome.output_path, status
                );
                if print_report {
                    outcome.report.print_table();
                }
            }
            Err(err) => {
                tracing::error!(ticker = %ticker, "{:#}", err);
                failed.push(ticker.clone());
            }
        }
    }

    if !failed.is_empty() {
        bail!("Alignment failed for {}", failed.join(", "));
    }
    Ok(())
}

fn run_backtests(config: &RunConfiguration) -> Result<()> {
    if config.strategies.is_empty() {
        bail!("No strategies configured");
    }
    let series = prepare_series(config)?;
    if series.bars.is_empty() {
        bail!("No bars for {} in the selected range", series.label);
    }
    println!("Selected: {} | Bars: {}", series.label, series.bars.len());

    let results = run_strategies(&series.bars, &config.strategies, &config.engine);

    for result in &results {
        println!("\n--- {} ---", result.strategy);
        result.summary.pretty_print_table();

        if let Some(path) = config.outputs.equity_path(&result.strategy) {
            save_equity_csv(&result.equity_curve, &path)?;
            println!("Equity curve saved to {:?}", path);
        }
        if let Some(path) = config.outputs.trades_path(&result.strategy) {
            save_trades_csv(&result.trades, &path)?;
            println!("Trades saved to {:?}", path);
        }
    }

    Ok(())
}
