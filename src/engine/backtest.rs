use crate::data::Bar;
use crate::engine::execution::{Commission, ExecutionEngine, Fill};
use crate::metrics::{calculate_equity_curve, EquityPoint, SummaryMetrics};
use crate::portfolio::{Account, ClosedTrade};
use crate::strategy::{Strategy, StrategyContext};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

//result of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub summary: SummaryMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<ClosedTrade>,
    pub fills: Vec<Fill>,
}

//configuration for a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cash: f64,
    pub commission: Commission,
    //a new entry first closes every open trade
    pub exclusive_orders: bool,
    //fill at the signal bar's close instead of the next bar's open
    pub trade_on_close: bool,
    pub hedging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cash: 100000.0,
            commission: Commission::default(),
            exclusive_orders: true,
            trade_on_close: true,
            hedging: false,
        }
    }
}

//main backtest engine
pub struct BacktestEngine<'a> {
    config: EngineConfig,
    bars: &'a [Bar],
    account: Account,
    execution: ExecutionEngine,
    equity_history: Vec<(NaiveDateTime, f64)>,
}

impl<'a> BacktestEngine<'a> {
    //creates a new backtest engine over a shared series
    pub fn new(config: EngineConfig, bars: &'a [Bar]) -> Self {
        let account = Account::new(config.cash, config.commission, config.hedging);
        let execution = ExecutionEngine::new(config.exclusive_orders);

        BacktestEngine {
            config,
            bars,
            account,
            execution,
            equity_history: Vec::with_capacity(bars.len()),
        }
    }

    //fills everything pending at price
    fn process_orders(&mut self, price: f64, timestamp: NaiveDateTime, index: usize) {
        for order in self.execution.take_pending() {
            self.account.execute(&order, price, timestamp, index);
        }
    }

    //runs the backtest with the given strategy
    pub fn run(&mut self, strategy: &mut dyn Strategy) -> BacktestResult {
        let bars = self.bars;
        strategy.init(bars);

        //main backtest loop
        for (i, bar) in bars.iter().enumerate() {
            //orders from the previous bar fill at this bar's open
            if !self.config.trade_on_close {
                self.process_orders(bar.open, bar.timestamp, i);
            }

            let mut context = StrategyContext::new(
                i,
                bars,
                self.account.position(bar.close),
                self.account.equity(bar.close),
                self.account.cash,
            );
            strategy.next(&mut context);
            for request in context.into_orders() {
                self.execution.submit(bar.timestamp, request);
            }

            //orders placed on the final bar have no bar left to fill on
            if self.config.trade_on_close && i + 1 < bars.len() {
                self.process_orders(bar.close, bar.timestamp, i);
            }

            self.equity_history
                .push((bar.timestamp, self.account.equity(bar.close)));
        }

        if let Some(last_bar) = bars.last() {
            let cancelled = self.execution.cancel_all_orders();
            if cancelled > 0 {
                tracing::debug!(cancelled, "orders left at the end of data cancelled");
            }

            //close what is still open at the last close
            self.account
                .close_all(0, last_bar.close, last_bar.timestamp, bars.len() - 1);

            //update final equity in history
            if let Some(last) = self.equity_history.last_mut() {
                last.1 = self.account.equity(last_bar.close);
            }
        }

        //build result
        self.build_result(strategy.name())
    }

    fn build_result(&self, strategy: &str) -> BacktestResult {
        let timestamps: Vec<_> = self.equity_history.iter().map(|(t, _)| *t).collect();
        let equity_values: Vec<_> = self.equity_history.iter().map(|(_, e)| *e).collect();

        let equity_curve = calculate_equity_curve(&timestamps, &equity_values, self.config.cash);
        let trades = self.account.closed_trades.clone();

        let buy_and_hold = match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) if first.close != 0.0 => (last.close - first.close) / first.close,
            _ => 0.0,
        };
        let summary =
            SummaryMetrics::from_backtest(&equity_curve, &trades, self.config.cash, buy_and_hold);

        tracing::info!(
            strategy,
            trades = trades.len(),
            final_equity = summary.final_balance,
            "backtest finished"
        );

        BacktestResult {
            strategy: strategy.to_string(),
            summary,
            equity_curve,
            trades,
            fills: self.account.fills.clone(),
        }
    }
}
