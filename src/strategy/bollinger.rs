use crate::data::Bar;
use crate::engine::execution::OrderSize;
use crate::strategy::indicators::{bollinger, closes, crossed_above, crossed_below, slope, sma, Bands};
use crate::strategy::{Strategy, StrategyContext};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub n: usize,
    pub k: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        BollingerParams { n: 390, k: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerTrendParams {
    pub n: usize,
    pub k: f64,
    //trend sma window, five sessions of minute bars by default
    pub n_ma: usize,
}

impl Default for BollingerTrendParams {
    fn default() -> Self {
        BollingerTrendParams {
            n: 390,
            k: 2.0,
            n_ma: 390 * 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerTouchParams {
    pub n: usize,
    pub k: f64,
}

impl Default for BollingerTouchParams {
    fn default() -> Self {
        BollingerTouchParams { n: 30, k: 2.0 }
    }
}

fn empty_bands() -> Bands {
    Bands {
        middle: Vec::new(),
        upper: Vec::new(),
        lower: Vec::new(),
    }
}

//mean reversion between the bands
//buys when the close climbs back above the lower band, closes when it drops back below the upper one
#[derive(Debug, Clone)]
pub struct BollingerStrategy {
    params: BollingerParams,
    closes: Vec<f64>,
    bands: Bands,
}

impl BollingerStrategy {
    pub fn new(params: BollingerParams) -> Self {
        BollingerStrategy {
            params,
            closes: Vec::new(),
            bands: empty_bands(),
        }
    }
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn init(&mut self, bars: &[Bar]) {
        self.closes = closes(bars);
        self.bands = bollinger(&self.closes, self.params.n, self.params.k);
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        let in_position = !ctx.position().is_flat();

        if crossed_above(&self.closes, &self.bands.lower, i) && !in_position {
            let units = ctx.all_in_units();
            if units > 0 {
                ctx.buy(OrderSize::Units(units));
            }
        } else if crossed_below(&self.closes, &self.bands.upper, i) && in_position {
            ctx.close_position();
        }
    }
}

//band entries filtered by a rising trend sma
//also exits when the close falls under the trend sma
#[derive(Debug, Clone)]
pub struct BollingerTrendStrategy {
    params: BollingerTrendParams,
    closes: Vec<f64>,
    bands: Bands,
    trend: Vec<f64>,
}

impl BollingerTrendStrategy {
    pub fn new(params: BollingerTrendParams) -> Self {
        BollingerTrendStrategy {
            params,
            closes: Vec::new(),
            bands: empty_bands(),
            trend: Vec::new(),
        }
    }
}

impl Strategy for BollingerTrendStrategy {
    fn name(&self) -> &str {
        "bollinger_trend"
    }

    fn init(&mut self, bars: &[Bar]) {
        self.closes = closes(bars);
        self.bands = bollinger(&self.closes, self.params.n, self.params.k);
        self.trend = sma(&self.closes, self.params.n_ma);
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        if i < 1 {
            return;
        }
        let in_position = !ctx.position().is_flat();
        let price = self.closes[i];
        let trend_slope = slope(&self.trend, i);

        if crossed_above(&self.closes, &self.bands.lower, i) && !in_position {
            if trend_slope > 0.0 {
                let units = ctx.all_in_units();
                if units > 0 {
                    ctx.buy(OrderSize::Units(units));
                }
            }
        } else if in_position
            && (crossed_below(&self.closes, &self.bands.upper, i) || price < self.trend[i])
        {
            ctx.close_position();
        }
    }
}

//intrabar band contact
//enters when the bar's low..high range holds the lower band or the open crosses up through it,
//exits the same way on the upper band; flat at 15:59, no trading before 09:00
#[derive(Debug, Clone)]
pub struct BollingerTouchStrategy {
    params: BollingerTouchParams,
    closes: Vec<f64>,
    bands: Bands,
}

impl BollingerTouchStrategy {
    pub fn new(params: BollingerTouchParams) -> Self {
        BollingerTouchStrategy {
            params,
            closes: Vec::new(),
            bands: empty_bands(),
        }
    }
}

impl Strategy for BollingerTouchStrategy {
    fn name(&self) -> &str {
        "bollinger_touch"
    }

    fn init(&mut self, bars: &[Bar]) {
        self.closes = closes(bars);
        self.bands = bollinger(&self.closes, self.params.n, self.params.k);
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        let (lower, upper) = (self.bands.lower[i], self.bands.upper[i]);
        if i < 1 || lower.is_nan() || upper.is_nan() {
            return;
        }

        let in_position = !ctx.position().is_flat();
        let time = ctx.time().time();
        if time.hour() == 15 && time.minute() == 59 {
            if in_position {
                ctx.close_position();
            }
            return;
        }
        if time.hour() < 9 {
            return;
        }

        let bar = ctx.bar();
        let prev_close = self.closes[i - 1];
        let touches = |band: f64| bar.low <= band && band <= bar.high;

        if !in_position {
            let opened_above = prev_close < self.bands.lower[i - 1] && bar.open > lower;
            if touches(lower) || opened_above {
                let units = ctx.all_in_units();
                if units > 0 {
                    ctx.buy(OrderSize::Units(units));
                }
            }
        } else {
            let opened_below = prev_close > self.bands.upper[i - 1] && bar.open < upper;
            if touches(upper) || opened_below {
                ctx.close_position();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execution::OrderRequest;
    use crate::strategy::testing::{minute_bars, step};
    use chrono::Duration;

    #[test]
    fn buys_back_above_lower_band() {
        let bars = minute_bars(&[10.0, 10.0, 10.0, 10.0, 4.0, 10.0]);
        let mut s = BollingerStrategy::new(BollingerParams { n: 3, k: 1.0 });
        s.init(&bars);
        assert_eq!(
            step(&mut s, &bars, 5, 0),
            vec![OrderRequest::Buy(OrderSize::Units(100))]
        );
        assert!(step(&mut s, &bars, 5, 100).is_empty());
        //warm-up bars never trade
        assert!(step(&mut s, &bars, 1, 0).is_empty());
    }

    #[test]
    fn closes_back_below_upper_band() {
        let bars = minute_bars(&[10.0, 10.0, 10.0, 10.0, 16.0, 10.0]);
        let mut s = BollingerStrategy::new(BollingerParams { n: 3, k: 1.0 });
        s.init(&bars);
        assert_eq!(step(&mut s, &bars, 5, 100), vec![OrderRequest::Close]);
        assert!(step(&mut s, &bars, 5, 0).is_empty());
    }

    fn trend_strategy(bars: &[Bar], n_ma: usize) -> BollingerTrendStrategy {
        let mut s = BollingerTrendStrategy::new(BollingerTrendParams { n: 3, k: 1.0, n_ma });
        s.init(bars);
        s
    }

    #[test]
    fn trend_filter_gates_entries() {
        let rising = minute_bars(&[1.0, 2.0, 10.0, 10.0, 4.0, 10.0]);
        let mut s = trend_strategy(&rising, 4);
        assert_eq!(
            step(&mut s, &rising, 5, 0),
            vec![OrderRequest::Buy(OrderSize::Units(100))]
        );

        //same band cross with a flat trend sma
        let flat = minute_bars(&[10.0, 10.0, 10.0, 10.0, 4.0, 10.0]);
        let mut s = trend_strategy(&flat, 4);
        assert!(step(&mut s, &flat, 5, 0).is_empty());
    }

    #[test]
    fn exits_under_the_trend_sma() {
        let bars = minute_bars(&[1.0, 2.0, 10.0, 10.0, 4.0, 10.0]);
        let mut s = trend_strategy(&bars, 4);
        assert_eq!(step(&mut s, &bars, 4, 100), vec![OrderRequest::Close]);
        assert!(step(&mut s, &bars, 4, 0).is_empty());
    }

    //closes 10, 10, 10, 10, 7 then a bar opening at 9 that never reaches a band
    fn touch_bars() -> Vec<Bar> {
        let mut bars = minute_bars(&[10.0, 10.0, 10.0, 10.0, 7.0, 10.0]);
        let last = bars[5].timestamp;
        bars[5] = Bar::new_unchecked(last, 9.0, 10.0, 8.5, 10.0, 100.0);
        bars
    }

    fn touch_strategy(bars: &[Bar]) -> BollingerTouchStrategy {
        let mut s = BollingerTouchStrategy::new(BollingerTouchParams { n: 3, k: 1.0 });
        s.init(bars);
        s
    }

    fn shifted(bars: &[Bar], minutes: i64) -> Vec<Bar> {
        bars.iter()
            .map(|b| {
                Bar::new_unchecked(b.timestamp + Duration::minutes(minutes), b.open, b.high, b.low, b.close, b.volume)
            })
            .collect()
    }

    #[test]
    fn range_touching_a_band_trades() {
        //window 11, 9, 10: lower 9 and upper 11 both sit inside 8..12
        let mut bars = minute_bars(&[10.0, 10.0, 11.0, 9.0, 10.0]);
        let last = bars[4].timestamp;
        bars[4] = Bar::new_unchecked(last, 10.0, 12.0, 8.0, 10.0, 100.0);
        let mut s = touch_strategy(&bars);
        assert_eq!(
            step(&mut s, &bars, 4, 0),
            vec![OrderRequest::Buy(OrderSize::Units(100))]
        );
        assert_eq!(step(&mut s, &bars, 4, 100), vec![OrderRequest::Close]);
    }

    #[test]
    fn open_crossing_the_lower_band_enters() {
        let bars = touch_bars();
        let mut s = touch_strategy(&bars);
        assert_eq!(
            step(&mut s, &bars, 5, 0),
            vec![OrderRequest::Buy(OrderSize::Units(100))]
        );
        //no upper contact, the position is held
        assert!(step(&mut s, &bars, 5, 100).is_empty());
    }

    #[test]
    fn session_clock_gates_orders() {
        //bar 5 at 08:35: too early to trade
        let early = shifted(&touch_bars(), -60);
        let mut s = touch_strategy(&early);
        assert!(step(&mut s, &early, 5, 0).is_empty());

        //bar 5 at 15:59: flat out, never a new entry
        let late = shifted(&touch_bars(), 384);
        let mut s = touch_strategy(&late);
        assert_eq!(step(&mut s, &late, 5, 100), vec![OrderRequest::Close]);
        assert!(step(&mut s, &late, 5, 0).is_empty());
    }
}
