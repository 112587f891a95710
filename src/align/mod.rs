pub mod coverage;
pub mod finalize;
pub mod gap_fill;
pub mod pipeline;
pub mod session;

pub use coverage::{check_coverage, raw_missing_days, CoverageReport};
pub use finalize::{finalize, write_clean_csv, CleanBar, UnseededPolicy};
pub use gap_fill::{fill_missing_minutes, DayFold, GridBar};
pub use pipeline::{align_ticker, discover_tickers, ticker_file, AlignOutcome};
pub use session::{
    load_session_bars, localize, normalize, parse_timezone, SessionBar, SessionError,
    SessionWindow, SourceTz,
};
