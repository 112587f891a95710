use crate::metrics::timeseries::{daily_returns, max_drawdown, EquityPoint};
use crate::portfolio::ClosedTrade;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//summary metrics for a backtest
//returns, drawdown and rates are fractions; the printed table shows them as percentages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub buy_and_hold_return_pct: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub num_trades: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    //mean per-trade return
    pub expectancy_pct: f64,
    //NaN without winning (losing) trades
    pub avg_win_pct: f64,
    pub avg_loss_pct: f64,
    //winning trades per non-winning trade
    pub win_loss_ratio: f64,
    //total return per hour held; NaN when nothing was held
    pub profit_per_hour_pct: f64,
    pub profit_per_hour: f64,
    pub avg_holding_hours: f64,
    pub total_holding_hours: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub exposure: f64,
}

impl SummaryMetrics {
    //calculate summary metrics from equity curve and closed trades
    pub fn from_backtest(
        equity_curve: &[EquityPoint],
        trades: &[ClosedTrade],
        initial_balance: f64,
        buy_and_hold_return_pct: f64,
    ) -> Self {
        let start_balance = equity_curve
            .first()
            .map(|p| p.equity)
            .unwrap_or(initial_balance);
        let final_balance = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_balance);

        let total_return = final_balance - start_balance;
        let total_return_pct = if initial_balance != 0.0 {
            (final_balance - initial_balance) / initial_balance
        } else {
            0.0
        };

        let max_dd = max_drawdown(equity_curve);

        let returns = daily_returns(equity_curve);
        let sharpe = calculate_sharpe_ratio(&returns);
        let sortino = calculate_sortino_ratio(&returns);

        let stats = calculate_trade_statistics(trades);

        let (profit_per_hour_pct, profit_per_hour) = if stats.total_holding_hours > 0.0 {
            let pnl: f64 = trades.iter().map(|t| t.pnl).sum();
            (
                total_return_pct / stats.total_holding_hours,
                pnl / stats.total_holding_hours,
            )
        } else {
            (f64::NAN, f64::NAN)
        };

        let exposure = calculate_exposure(equity_curve, trades);

        SummaryMetrics {
            initial_balance: start_balance,
            final_balance,
            total_return,
            total_return_pct,
            buy_and_hold_return_pct,
            max_drawdown: max_dd,
            sharpe_ratio: sharpe,
            sortino_ratio: sortino,
            num_trades: stats.num_trades,
            num_winning_trades: stats.num_winning_trades,
            num_losing_trades: stats.num_losing_trades,
            win_rate: stats.win_rate,
            profit_factor: stats.profit_factor,
            expectancy_pct: stats.expectancy,
            avg_win_pct: stats.avg_win,
            avg_loss_pct: stats.avg_loss,
            win_loss_ratio: stats.win_loss_ratio,
            profit_per_hour_pct,
            profit_per_hour,
            avg_holding_hours: stats.avg_holding_hours,
            total_holding_hours: stats.total_holding_hours,
            largest_win: stats.largest_win,
            largest_loss: stats.largest_loss,
            exposure,
        }
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        if self.num_trades == 0 {
            println!("No closed trades.");
            println!(
                "Net P&L: ${:.2} (from ${:.2} to ${:.2})",
                self.total_return, self.initial_balance, self.final_balance
            );
            return;
        }

        let mut table = Table::new();
        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows: Vec<(&str, String)> = vec![
            ("Initial Balance", format!("${:.2}", self.initial_balance)),
            ("Final Balance", format!("${:.2}", self.final_balance)),
            (
                "Total Return",
                format!("${:.2} ({:.2}%)", self.total_return, self.total_return_pct * 100.0),
            ),
            (
                "Buy & Hold Return",
                format!("{:.2}%", self.buy_and_hold_return_pct * 100.0),
            ),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown * 100.0)),
            ("Sharpe Ratio", format!("{:.3}", self.sharpe_ratio)),
            ("Sortino Ratio", format!("{:.3}", self.sortino_ratio)),
            ("Number of Trades", format!("{}", self.num_trades)),
            ("Win Rate", format!("{:.2}%", self.win_rate * 100.0)),
            ("Profit Factor", format!("{:.2}", self.profit_factor)),
            ("Expectancy", format!("{:.2}%", self.expectancy_pct * 100.0)),
            ("Avg Win", format!("{:.2}%", self.avg_win_pct * 100.0)),
            ("Avg Loss", format!("{:.2}%", self.avg_loss_pct * 100.0)),
            ("Win/Loss Ratio", format!("{:.2}", self.win_loss_ratio)),
            (
                "Profit per Hour",
                format!(
                    "{:.4}%/hr (${:.2}/hr)",
                    self.profit_per_hour_pct * 100.0,
                    self.profit_per_hour
                ),
            ),
            ("Largest Win", format!("${:.2}", self.largest_win)),
            ("Largest Loss", format!("${:.2}", self.largest_loss)),
            ("Avg Holding Time", format!("{:.2} hours", self.avg_holding_hours)),
            ("Total Holding Time", format!("{:.2} hours", self.total_holding_hours)),
            ("Exposure", format!("{:.2}%", self.exposure * 100.0)),
        ];
        for (metric, value) in rows {
            table.add_row(Row::new(vec![Cell::new(metric), Cell::new(&value)]));
        }

        table.printstd();
    }
}

struct TradeStats {
    num_trades: usize,
    num_winning_trades: usize,
    num_losing_trades: usize,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    expectancy: f64,
    win_loss_ratio: f64,
    profit_factor: f64,
    largest_win: f64,
    largest_loss: f64,
    avg_holding_hours: f64,
    total_holding_hours: f64,
}

fn calculate_trade_statistics(trades: &[ClosedTrade]) -> TradeStats {
    if trades.is_empty() {
        return TradeStats {
            num_trades: 0,
            num_winning_trades: 0,
            num_losing_trades: 0,
            win_rate: 0.0,
            avg_win: f64::NAN,
            avg_loss: f64::NAN,
            expectancy: f64::NAN,
            win_loss_ratio: f64::NAN,
            profit_factor: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            avg_holding_hours: 0.0,
            total_holding_hours: 0.0,
        };
    }

    //break-even trades count with the losers
    let (winners, losers): (Vec<&ClosedTrade>, Vec<&ClosedTrade>) =
        trades.iter().partition(|t| t.is_win());

    let num_winning = winners.len();
    let num_losing = losers.len();
    let total = trades.len();

    let mean_return = |group: &[&ClosedTrade]| {
        if group.is_empty() {
            f64::NAN
        } else {
            group.iter().map(|t| t.return_pct).mean()
        }
    };

    let total_wins: f64 = winners.iter().map(|t| t.pnl).sum();
    let total_losses: f64 = losers.iter().map(|t| t.pnl).sum::<f64>().abs();

    let profit_factor = if total_losses > 0.0 {
        total_wins / total_losses
    } else if total_wins > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let win_loss_ratio = if num_losing > 0 {
        num_winning as f64 / num_losing as f64
    } else {
        f64::INFINITY
    };

    let hours: Vec<f64> = trades.iter().map(|t| t.holding_hours()).collect();
    let total_holding_hours: f64 = hours.iter().sum();

    TradeStats {
        num_trades: total,
        num_winning_trades: num_winning,
        num_losing_trades: num_losing,
        win_rate: num_winning as f64 / total as f64,
        avg_win: mean_return(&winners),
        avg_loss: mean_return(&losers),
        expectancy: trades.iter().map(|t| t.return_pct).mean(),
        win_loss_ratio,
        profit_factor,
        largest_win: winners.iter().map(|t| t.pnl).fold(0.0f64, f64::max),
        largest_loss: losers.iter().map(|t| t.pnl).fold(0.0f64, f64::min),
        avg_holding_hours: total_holding_hours / total as f64,
        total_holding_hours,
    }
}

fn calculate_sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.mean();
    let std_dev = returns.std_dev();

    if std_dev == 0.0 || std_dev.is_nan() {
        return 0.0;
    }

    //annualized from daily returns
    (mean / std_dev) * (252.0_f64).sqrt()
}

fn calculate_sortino_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.mean();

    //downside deviation from negative returns only
    let negative_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();

    if negative_returns.is_empty() {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }

    let downside_dev = negative_returns.std_dev();

    if downside_dev == 0.0 || downside_dev.is_nan() {
        return 0.0;
    }

    (mean / downside_dev) * (252.0_f64).sqrt()
}

//share of equity points during which a trade was open
fn calculate_exposure(equity_curve: &[EquityPoint], trades: &[ClosedTrade]) -> f64 {
    if equity_curve.is_empty() {
        return 0.0;
    }

    let mut held = vec![false; equity_curve.len()];
    for trade in trades {
        let end = trade.exit_index.min(equity_curve.len());
        for slot in held.iter_mut().take(end).skip(trade.entry_index) {
            *slot = true;
        }
    }

    held.iter().filter(|&&h| h).count() as f64 / equity_curve.len() as f64
}
