use crate::data::Bar;
use crate::engine::execution::OrderSize;
use crate::strategy::indicators::{closes, rolling_std, sma};
use crate::strategy::{Strategy, StrategyContext};
use serde::{Deserialize, Serialize};

//how an all-in entry is sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    //whole units the equity buys at the close
    #[default]
    Units,
    //a fraction of available equity, sized at the fill
    Fraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZScoreParams {
    pub window: usize,
    pub z_entry: f64,
    pub z_exit: f64,
    //entries only while the rolling deviation is at or under this
    pub vol_limit: f64,
    pub allow_short: bool,
    pub min_std: f64,
    pub ddof: u8,
    pub size_mode: SizeMode,
    pub fraction_all_in: f64,
}

impl Default for ZScoreParams {
    fn default() -> Self {
        ZScoreParams {
            window: 10,
            z_entry: 2.0,
            z_exit: 0.5,
            vol_limit: 0.02,
            allow_short: false,
            min_std: 1e-8,
            ddof: 0,
            size_mode: SizeMode::Units,
            fraction_all_in: 0.999,
        }
    }
}

//rolling z-score reversion with a volatility cap
#[derive(Debug, Clone)]
pub struct ZScoreStrategy {
    params: ZScoreParams,
    z: Vec<f64>,
    std: Vec<f64>,
}

impl ZScoreStrategy {
    pub fn new(params: ZScoreParams) -> Self {
        ZScoreStrategy {
            params,
            z: Vec::new(),
            std: Vec::new(),
        }
    }

    fn entry_size(&self, ctx: &StrategyContext<'_>) -> Option<OrderSize> {
        match self.params.size_mode {
            SizeMode::Fraction => Some(OrderSize::Fraction(self.params.fraction_all_in)),
            SizeMode::Units => match ctx.all_in_units() {
                0 => None,
                units => Some(OrderSize::Units(units)),
            },
        }
    }
}

impl Strategy for ZScoreStrategy {
    fn name(&self) -> &str {
        "zscore"
    }

    fn init(&mut self, bars: &[Bar]) {
        let closes = closes(bars);
        let mean = sma(&closes, self.params.window);
        self.std = rolling_std(&closes, self.params.window, self.params.ddof);
        self.z = closes
            .iter()
            .zip(mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s.max(self.params.min_std))
            .collect();
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let i = ctx.index();
        let (z, vol) = (self.z[i], self.std[i]);
        if z.is_nan() || vol.is_nan() {
            return;
        }
        let p = &self.params;

        let position = ctx.position().clone();
        if !position.is_flat() {
            if position.is_long() && z >= -p.z_exit {
                ctx.close_position();
            } else if p.allow_short && position.is_short() && z <= p.z_exit {
                ctx.close_position();
            }
            return;
        }

        if z <= -p.z_entry && vol <= p.vol_limit {
            if let Some(size) = self.entry_size(ctx) {
                ctx.buy(size);
            }
        } else if p.allow_short && z >= p.z_entry && vol <= p.vol_limit {
            if let Some(size) = self.entry_size(ctx) {
                ctx.sell(size);
            }
        }
    }
}
