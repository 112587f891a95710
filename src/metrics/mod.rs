pub mod summary;
pub mod timeseries;

pub use summary::SummaryMetrics;
pub use timeseries::{calculate_equity_curve, daily_returns, max_drawdown, EquityPoint};
