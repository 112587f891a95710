use crate::data::Bar;
use crate::engine::execution::OrderSize;
use crate::strategy::{Strategy, StrategyContext};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CusumParams {
    //drift allowance subtracted every bar
    pub k: f64,
    //detection threshold
    pub h: f64,
    pub lookback: usize,
}

impl Default for CusumParams {
    fn default() -> Self {
        CusumParams {
            k: 0.5,
            h: 5.0,
            lookback: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Neutral,
    High,
    Low,
}

//two-sided cusum filter on the close
//an upward shift flips the book long, a downward one flips it short
#[derive(Debug, Clone)]
pub struct CusumStrategy {
    params: CusumParams,
    s_pos: f64,
    s_neg: f64,
    regime: Regime,
}

impl CusumStrategy {
    pub fn new(params: CusumParams) -> Self {
        CusumStrategy {
            params,
            s_pos: 0.0,
            s_neg: 0.0,
            regime: Regime::Neutral,
        }
    }

    fn flip(&mut self, ctx: &mut StrategyContext<'_>, regime: Regime) {
        if self.regime != regime {
            if !ctx.position().is_flat() {
                ctx.close_position();
            }
            match regime {
                Regime::High => ctx.buy(OrderSize::default()),
                Regime::Low => ctx.sell(OrderSize::default()),
                Regime::Neutral => {}
            }
            self.regime = regime;
        }
        self.s_pos = 0.0;
        self.s_neg = 0.0;
    }
}

impl Strategy for CusumStrategy {
    fn name(&self) -> &str {
        "cusum"
    }

    fn init(&mut self, _bars: &[Bar]) {
        self.s_pos = 0.0;
        self.s_neg = 0.0;
        self.regime = Regime::Neutral;
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let history = ctx.history();
        let x = ctx.bar().close;
        let start = history.len().saturating_sub(self.params.lookback.max(1));
        let mu = history[start..].iter().map(|b| b.close).mean();

        self.s_pos = (self.s_pos + x - mu - self.params.k).max(0.0);
        self.s_neg = (self.s_neg - (x - mu) - self.params.k).max(0.0);

        if self.s_pos > self.params.h {
            self.flip(ctx, Regime::High);
        } else if self.s_neg > self.params.h {
            self.flip(ctx, Regime::Low);
        }
    }
}
