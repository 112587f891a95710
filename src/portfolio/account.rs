use crate::engine::execution::{Commission, Fill, Order, OrderKind, OrderSize};
use crate::portfolio::position::{ClosedTrade, Position, Trade};
use chrono::NaiveDateTime;
use std::collections::VecDeque;

//represents a cash account holding open lots of one instrument
#[derive(Debug, Clone)]
pub struct Account {
    //initial account balance
    pub initial_balance: f64,

    //current cash, sale proceeds included, purchases and commissions deducted
    pub cash: f64,

    //open lots, oldest first
    pub open_trades: VecDeque<Trade>,

    pub closed_trades: Vec<ClosedTrade>,

    //complete fill log
    pub fills: Vec<Fill>,

    pub commission: Commission,

    //when false, an opposite order reduces open lots first in, first out
    pub hedging: bool,

    next_fill_id: u64,
}

impl Account {
    pub fn new(initial_balance: f64, commission: Commission, hedging: bool) -> Self {
        Account {
            initial_balance,
            cash: initial_balance,
            open_trades: VecDeque::new(),
            closed_trades: Vec::new(),
            fills: Vec::new(),
            commission,
            hedging,
            next_fill_id: 1,
        }
    }

    pub fn net_qty(&self) -> i64 {
        self.open_trades.iter().map(|t| t.size).sum()
    }

    //cash plus the market value of the open lots
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.net_qty() as f64 * price
    }

    pub fn position(&self, price: f64) -> Position {
        Position::from_trades(&self.open_trades, price)
    }

    //equity not tied up in open lots
    fn available(&self, price: f64) -> f64 {
        let tied: f64 = self
            .open_trades
            .iter()
            .map(|t| t.size.abs() as f64 * price)
            .sum();
        self.equity(price) - tied
    }

    fn record_fill(&mut self, order_id: u64, timestamp: NaiveDateTime, qty: i64, price: f64, fees: f64) {
        self.cash -= qty as f64 * price + fees;
        self.fills.push(Fill {
            id: self.next_fill_id,
            order_id,
            timestamp,
            qty,
            fill_price: price,
            fees,
        });
        self.next_fill_id += 1;
    }

    //executes one order at price; returns false when it was cancelled
    pub fn execute(&mut self, order: &Order, price: f64, timestamp: NaiveDateTime, index: usize) -> bool {
        match order.kind {
            OrderKind::CloseAll => {
                self.close_all(order.id, price, timestamp, index);
                true
            }
            OrderKind::Entry { side, size } => {
                let units = match size {
                    OrderSize::Units(units) => units as i64,
                    OrderSize::Fraction(fraction) => {
                        let budget = fraction.clamp(0.0, 1.0) * self.available(price);
                        let unit_cost = self.commission.unit_cost(price);
                        if unit_cost > 0.0 {
                            (budget / unit_cost).floor().max(0.0) as i64
                        } else {
                            0
                        }
                    }
                };
                if units == 0 {
                    tracing::debug!(order = order.id, "order sized to zero units, cancelled");
                    return false;
                }
                let mut remaining = units * side.to_qty_sign();

                if !self.hedging {
                    remaining = self.reduce_fifo(order.id, remaining, price, timestamp, index);
                }
                if remaining == 0 {
                    return true;
                }

                let fees = self.commission.fee(remaining, price);
                let cost = remaining.abs() as f64 * price + fees;
                if cost > self.available(price) {
                    tracing::debug!(
                        order = order.id,
                        units = remaining,
                        cost,
                        "insufficient equity, order cancelled"
                    );
                    return false;
                }

                self.record_fill(order.id, timestamp, remaining, price, fees);
                self.open_trades.push_back(Trade {
                    size: remaining,
                    entry_price: price,
                    entry_time: timestamp,
                    entry_index: index,
                    entry_fees: fees,
                });
                true
            }
        }
    }

    //closes opposite lots oldest first and returns the signed quantity left over
    fn reduce_fifo(&mut self, order_id: u64, mut qty: i64, price: f64, timestamp: NaiveDateTime, index: usize) -> i64 {
        while qty != 0 {
            let Some(front) = self.open_trades.front_mut() else {
                break;
            };
            if front.size.signum() == qty.signum() {
                break;
            }
            let units = qty.abs().min(front.size.abs());
            let fill_qty = units * qty.signum();
            let fees = self.commission.fee(fill_qty, price);
            let closed = front.close_units(units, price, timestamp, index, fees);
            if front.size == 0 {
                self.open_trades.pop_front();
            }
            self.record_fill(order_id, timestamp, fill_qty, price, fees);
            self.closed_trades.push(closed);
            qty -= fill_qty;
        }
        qty
    }

    //closes every open lot at price
    pub fn close_all(&mut self, order_id: u64, price: f64, timestamp: NaiveDateTime, index: usize) {
        while let Some(mut trade) = self.open_trades.pop_front() {
            let units = trade.size.abs();
            let fill_qty = -trade.size;
            let fees = self.commission.fee(fill_qty, price);
            let closed = trade.close_units(units, price, timestamp, index, fees);
            self.record_fill(order_id, timestamp, fill_qty, price, fees);
            self.closed_trades.push(closed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execution::OrderSide;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn entry(id: u64, side: OrderSide, size: OrderSize) -> Order {
        Order {
            id,
            placed_at: ts(),
            kind: OrderKind::Entry { side, size },
        }
    }

    #[test]
    fn buy_then_sell_reduces_fifo() {
        let mut account = Account::new(10_000.0, Commission::default(), false);
        assert!(account.execute(&entry(1, OrderSide::Buy, OrderSize::Units(10)), 100.0, ts(), 0));
        assert!(account.execute(&entry(2, OrderSide::Buy, OrderSize::Units(10)), 110.0, ts(), 1));
        assert_eq!(account.net_qty(), 20);

        //sells 15: closes the first lot fully and half of the second
        assert!(account.execute(&entry(3, OrderSide::Sell, OrderSize::Units(15)), 120.0, ts(), 2));
        assert_eq!(account.closed_trades.len(), 2);
        assert_eq!(account.closed_trades[0].pnl, 200.0);
        assert_eq!(account.closed_trades[1].pnl, 50.0);
        assert_eq!(account.net_qty(), 5);
        assert_eq!(account.equity(120.0), 10_000.0 + 200.0 + 50.0 + 50.0);
    }

    #[test]
    fn opposite_order_larger_than_position_flips() {
        let mut account = Account::new(10_000.0, Commission::default(), false);
        account.execute(&entry(1, OrderSide::Buy, OrderSize::Units(10)), 100.0, ts(), 0);
        account.execute(&entry(2, OrderSide::Sell, OrderSize::Units(15)), 100.0, ts(), 1);
        assert_eq!(account.net_qty(), -5);
        assert_eq!(account.closed_trades.len(), 1);
    }

    #[test]
    fn fraction_sizing_and_cancellation() {
        let mut account = Account::new(1_000.0, Commission::default(), false);
        assert!(account.execute(&entry(1, OrderSide::Buy, OrderSize::Fraction(0.9999)), 30.0, ts(), 0));
        assert_eq!(account.net_qty(), 33);

        //nothing left to buy with
        assert!(!account.execute(&entry(2, OrderSide::Buy, OrderSize::Units(5)), 30.0, ts(), 1));
        assert_eq!(account.net_qty(), 33);
    }

    #[test]
    fn close_all_realizes_everything() {
        let mut account = Account::new(
            1_000.0,
            Commission {
                per_share: 1.0,
                rate: 0.0,
            },
            false,
        );
        account.execute(&entry(1, OrderSide::Sell, OrderSize::Units(2)), 50.0, ts(), 0);
        assert_eq!(account.cash, 1_000.0 + 100.0 - 2.0);
        account.close_all(2, 40.0, ts(), 1);
        assert!(account.open_trades.is_empty());
        assert_eq!(account.closed_trades[0].pnl, 20.0 - 2.0 - 2.0);
        assert_eq!(account.cash, 1_000.0 + 20.0 - 4.0);
        assert_eq!(account.fills.len(), 2);
    }

    #[test]
    fn hedging_keeps_both_sides() {
        let mut account = Account::new(10_000.0, Commission::default(), true);
        account.execute(&entry(1, OrderSide::Buy, OrderSize::Units(10)), 100.0, ts(), 0);
        account.execute(&entry(2, OrderSide::Sell, OrderSize::Units(10)), 100.0, ts(), 1);
        assert_eq!(account.open_trades.len(), 2);
        assert_eq!(account.net_qty(), 0);
    }
}
