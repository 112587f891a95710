use crate::data::Bar;
use crate::engine::execution::OrderSize;
use crate::strategy::indicators::{closes, crossed_above, crossed_below, sma};
use crate::strategy::{Strategy, StrategyContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossParams {
    pub n_1: usize,
    pub n_2: usize,
    pub n_3: usize,
}

impl Default for MaCrossParams {
    fn default() -> Self {
        MaCrossParams {
            n_1: 30,
            n_2: 90,
            n_3: 270,
        }
    }
}

//price crossing any of three smas
//buys all-in on an upward cross while flat, closes on a downward cross
//a downward cross wins when both happen on the same bar
#[derive(Debug, Clone)]
pub struct MaCrossStrategy {
    params: MaCrossParams,
    closes: Vec<f64>,
    mas: [Vec<f64>; 3],
}

impl MaCrossStrategy {
    pub fn new(params: MaCrossParams) -> Self {
        MaCrossStrategy {
            params,
            closes: Vec::new(),
            mas: [Vec::new(), Vec::new(), Vec::new()],
        }
    }
}

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn init(&mut self, bars: &[Bar]) {
        self.closes = closes(bars);
        self.mas = [
            sma(&self.closes, self.params.n_1),
            sma(&self.closes, self.params.n_2),
            sma(&self.closes, self.params.n_3),
        ];
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        if i < 1 || self.mas[2][i].is_nan() {
            return;
        }

        let cross_up = self.mas.iter().any(|ma| crossed_above(&self.closes, ma, i));
        let cross_down = self.mas.iter().any(|ma| crossed_below(&self.closes, ma, i));

        let in_position = !ctx.position().is_flat();
        if in_position && cross_down {
            ctx.close_position();
            return;
        }

        if !in_position && cross_up {
            let units = ctx.all_in_units();
            if units > 0 {
                ctx.buy(OrderSize::Units(units));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execution::OrderRequest;
    use crate::strategy::testing::{minute_bars, step};

    fn strategy(bars: &[Bar]) -> MaCrossStrategy {
        let mut s = MaCrossStrategy::new(MaCrossParams { n_1: 2, n_2: 3, n_3: 4 });
        s.init(bars);
        s
    }

    #[test]
    fn buys_on_upward_cross_and_closes_on_downward_cross() {
        let bars = minute_bars(&[10.0, 10.0, 10.0, 10.0, 9.0, 12.0, 8.0]);
        let mut s = strategy(&bars);

        //long windows not ready yet
        assert!(step(&mut s, &bars, 2, 0).is_empty());

        assert_eq!(
            step(&mut s, &bars, 5, 0),
            vec![OrderRequest::Buy(OrderSize::Units(83))]
        );
        //already long, no second entry
        assert!(step(&mut s, &bars, 5, 83).is_empty());

        assert_eq!(step(&mut s, &bars, 6, 83), vec![OrderRequest::Close]);
        //nothing to close while flat
        assert!(step(&mut s, &bars, 6, 0).is_empty());
    }
}
