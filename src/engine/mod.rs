pub mod backtest;
pub mod execution;
pub mod runner;

pub use backtest::{BacktestEngine, BacktestResult, EngineConfig};
pub use execution::{Commission, ExecutionEngine, Fill, Order, OrderKind, OrderRequest, OrderSide, OrderSize};
pub use runner::{run_strategies, save_equity_csv, save_trades_csv};
