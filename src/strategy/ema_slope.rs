use crate::data::Bar;
use crate::engine::execution::OrderSize;
use crate::strategy::indicators::{closes, ema};
use crate::strategy::{Strategy, StrategyContext};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaSlopeParams {
    pub n_1: usize,
    pub n_2: usize,
    pub n_3: usize,
}

impl Default for EmaSlopeParams {
    fn default() -> Self {
        EmaSlopeParams {
            n_1: 30,
            n_2: 60,
            n_3: 90,
        }
    }
}

//long while all three emas rise, flat otherwise
//flattens on the 15:59 bar and enters no earlier than 09:59
#[derive(Debug, Clone)]
pub struct EmaSlopeStrategy {
    params: EmaSlopeParams,
    emas: [Vec<f64>; 3],
}

impl EmaSlopeStrategy {
    pub fn new(params: EmaSlopeParams) -> Self {
        EmaSlopeStrategy {
            params,
            emas: [Vec::new(), Vec::new(), Vec::new()],
        }
    }
}

impl Strategy for EmaSlopeStrategy {
    fn name(&self) -> &str {
        "ema_slope"
    }

    fn init(&mut self, bars: &[Bar]) {
        let closes = closes(bars);
        self.emas = [
            ema(&closes, self.params.n_1),
            ema(&closes, self.params.n_2),
            ema(&closes, self.params.n_3),
        ];
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        if i < 1 {
            return;
        }
        if self
            .emas
            .iter()
            .any(|e| e[i].is_nan() || e[i - 1].is_nan())
        {
            return;
        }

        let time = ctx.time().time();
        let in_position = !ctx.position().is_flat();

        if time.hour() == 15 && time.minute() == 59 {
            if in_position {
                ctx.close_position();
            }
            return;
        }

        let rising = self.emas.iter().all(|e| e[i] > e[i - 1]);
        if rising {
            let after_open = time.hour() > 9 || (time.hour() == 9 && time.minute() >= 59);
            if !in_position && after_open {
                let units = ctx.all_in_units();
                if units > 0 {
                    ctx.buy(OrderSize::Units(units));
                }
            }
        } else if in_position {
            ctx.close_position();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execution::OrderRequest;
    use crate::strategy::testing::{minute_bars, step};

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 + i as f64 * 0.1).collect()
    }

    fn strategy(bars: &[Bar]) -> EmaSlopeStrategy {
        let mut s = EmaSlopeStrategy::new(EmaSlopeParams { n_1: 2, n_2: 3, n_3: 4 });
        s.init(bars);
        s
    }

    #[test]
    fn no_entry_before_nine_fifty_nine() {
        let bars = minute_bars(&rising(40));
        let mut s = strategy(&bars);
        //09:40
        assert!(step(&mut s, &bars, 10, 0).is_empty());
        //09:59
        assert_eq!(step(&mut s, &bars, 29, 0).len(), 1);
        assert!(matches!(
            step(&mut s, &bars, 30, 0)[0],
            OrderRequest::Buy(OrderSize::Units(_))
        ));
    }

    #[test]
    fn falling_ema_flattens() {
        let mut closes = rising(35);
        closes.push(5.0);
        let bars = minute_bars(&closes);
        let mut s = strategy(&bars);
        assert_eq!(step(&mut s, &bars, 35, 10), vec![OrderRequest::Close]);
        assert!(step(&mut s, &bars, 34, 10).is_empty());
    }

    #[test]
    fn closes_on_the_last_session_minute() {
        //09:30 + 389 minutes = 15:59
        let bars = minute_bars(&rising(390));
        let mut s = strategy(&bars);
        assert_eq!(step(&mut s, &bars, 389, 10), vec![OrderRequest::Close]);
        assert!(step(&mut s, &bars, 389, 0).is_empty());
    }
}
