//minute-bar research toolkit: fetch raw aggregates, align them onto the exchange calendar, backtest strategies

pub mod align;
pub mod calendar;
pub mod config;
pub mod data;
pub mod engine;
pub mod fetch;
pub mod metrics;
pub mod portfolio;
pub mod series;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::align::{align_ticker, AlignOutcome, CoverageReport, SessionWindow, UnseededPolicy};
    pub use crate::calendar::{calendar_for, TradingCalendar};
    pub use crate::config::{
        AlignConfig, ConfigError, FetchConfig, OutputConfig, PipelineConfig, RunConfiguration,
        StrategySpec,
    };
    pub use crate::data::{load_clean_csv, load_raw_csv, Bar, RawBar};
    pub use crate::engine::{
        run_strategies, save_equity_csv, save_trades_csv, BacktestEngine, BacktestResult,
        Commission, EngineConfig, OrderSize,
    };
    pub use crate::fetch::{DataError, Fetcher, PolygonClient, RetryPolicy};
    pub use crate::metrics::{EquityPoint, SummaryMetrics};
    pub use crate::portfolio::{Account, ClosedTrade, Position};
    pub use crate::series::{prepare_series, PreparedSeries, Universes};
    pub use crate::strategy::{Strategy, StrategyContext};
}
