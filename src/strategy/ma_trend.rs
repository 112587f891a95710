use crate::data::Bar;
use crate::engine::execution::OrderSize;
use crate::strategy::indicators::{closes, sma};
use crate::strategy::{Strategy, StrategyContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaTrendParams {
    pub n_day: usize,
    pub n_short: usize,
    pub n_long: usize,
    //require every sma to rise, and exit as soon as the entry condition fails
    pub all_slopes: bool,
}

impl Default for MaTrendParams {
    fn default() -> Self {
        MaTrendParams {
            n_day: 30,
            n_short: 60,
            n_long: 90,
            all_slopes: false,
        }
    }
}

impl MaTrendParams {
    //five, ten and thirty sessions of minute bars, every slope positive
    pub fn all_rising() -> Self {
        MaTrendParams {
            n_day: 390 * 5,
            n_short: 390 * 10,
            n_long: 390 * 30,
            all_slopes: true,
        }
    }
}

//trend following on three smas
//enters when the shortest sma rises and price sits above all three; exits when it stops rising
#[derive(Debug, Clone)]
pub struct MaTrendStrategy {
    params: MaTrendParams,
    day: Vec<f64>,
    short: Vec<f64>,
    long: Vec<f64>,
}

impl MaTrendStrategy {
    pub fn new(params: MaTrendParams) -> Self {
        MaTrendStrategy {
            params,
            day: Vec::new(),
            short: Vec::new(),
            long: Vec::new(),
        }
    }
}

impl Strategy for MaTrendStrategy {
    fn name(&self) -> &str {
        "ma_trend"
    }

    fn init(&mut self, bars: &[Bar]) {
        let closes = closes(bars);
        self.day = sma(&closes, self.params.n_day);
        self.short = sma(&closes, self.params.n_short);
        self.long = sma(&closes, self.params.n_long);
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        if i < 1 {
            return;
        }
        let series = [&self.day, &self.short, &self.long];
        if series.iter().any(|s| s[i].is_nan() || s[i - 1].is_nan()) {
            return;
        }

        let price = ctx.bar().close;
        let day_rising = self.day[i] > self.day[i - 1];
        let rising = if self.params.all_slopes {
            series.iter().all(|s| s[i] > s[i - 1])
        } else {
            day_rising
        };
        let above_all = series.iter().all(|s| price > s[i]);
        let in_position = !ctx.position().is_flat();

        if rising && above_all {
            if !in_position {
                let units = ctx.all_in_units();
                if units > 0 {
                    ctx.buy(OrderSize::Units(units));
                }
            }
        } else if in_position && (self.params.all_slopes || !day_rising) {
            ctx.close_position();
        }
    }
}
