pub mod bollinger;
pub mod cusum;
pub mod ema_slope;
pub mod indicators;
pub mod ma_cross;
pub mod ma_trend;
pub mod zscore;

pub use bollinger::{
    BollingerParams, BollingerStrategy, BollingerTouchParams, BollingerTouchStrategy,
    BollingerTrendParams, BollingerTrendStrategy,
};
pub use cusum::{CusumParams, CusumStrategy};
pub use ema_slope::{EmaSlopeParams, EmaSlopeStrategy};
pub use ma_cross::{MaCrossParams, MaCrossStrategy};
pub use ma_trend::{MaTrendParams, MaTrendStrategy};
pub use zscore::{SizeMode, ZScoreParams, ZScoreStrategy};

use crate::data::Bar;
use crate::engine::execution::{OrderRequest, OrderSize};
use crate::portfolio::Position;
use chrono::NaiveDateTime;

//strategy interface that all strategies must implement
pub trait Strategy: Send {
    //returns the strategy name
    fn name(&self) -> &str;

    //called once with the whole series before the first bar
    fn init(&mut self, bars: &[Bar]);

    //called on each bar; orders go through the context
    fn next(&mut self, ctx: &mut StrategyContext<'_>);
}

//what a strategy may see and do on one bar
pub struct StrategyContext<'a> {
    index: usize,
    bars: &'a [Bar],
    position: Position,
    equity: f64,
    cash: f64,
    orders: Vec<OrderRequest>,
}

impl<'a> StrategyContext<'a> {
    pub fn new(index: usize, bars: &'a [Bar], position: Position, equity: f64, cash: f64) -> Self {
        StrategyContext {
            index,
            bars,
            position,
            equity,
            cash,
            orders: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    //returns the current bar
    pub fn bar(&self) -> &'a Bar {
        &self.bars[self.index]
    }

    pub fn time(&self) -> NaiveDateTime {
        self.bar().timestamp
    }

    //bars up to and including the current one
    pub fn history(&self) -> &'a [Bar] {
        &self.bars[..=self.index]
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    //whole units the current equity buys at the current close
    pub fn all_in_units(&self) -> u64 {
        let price = self.bar().close;
        if price > 0.0 && self.equity > 0.0 {
            (self.equity / price).floor() as u64
        } else {
            0
        }
    }

    pub fn buy(&mut self, size: OrderSize) {
        self.orders.push(OrderRequest::Buy(size));
    }

    pub fn sell(&mut self, size: OrderSize) {
        self.orders.push(OrderRequest::Sell(size));
    }

    //closes every open trade
    pub fn close_position(&mut self) {
        self.orders.push(OrderRequest::Close);
    }

    pub fn orders(&self) -> &[OrderRequest] {
        &self.orders
    }

    pub fn into_orders(self) -> Vec<OrderRequest> {
        self.orders
    }
}
