use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

//an open lot; positive size is long, negative is short
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub size: i64,
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub entry_index: usize,
    //commission paid on entry that is still attributed to the open units
    pub entry_fees: f64,
}

impl Trade {
    pub fn is_long(&self) -> bool {
        self.size > 0
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size as f64
    }

    //closes `units` (unsigned, at most |size|) at price and returns the closed part
    pub fn close_units(
        &mut self,
        units: i64,
        exit_price: f64,
        exit_time: NaiveDateTime,
        exit_index: usize,
        exit_fees: f64,
    ) -> ClosedTrade {
        let units = units.min(self.size.abs());
        let signed = units * self.size.signum();
        let share = units as f64 / self.size.abs() as f64;
        let entry_fees = self.entry_fees * share;

        let gross = (exit_price - self.entry_price) * signed as f64;
        let pnl = gross - entry_fees - exit_fees;
        let basis = self.entry_price * units as f64;
        let return_pct = if basis > 0.0 { pnl / basis } else { 0.0 };

        self.size -= signed;
        self.entry_fees -= entry_fees;

        ClosedTrade {
            size: signed,
            entry_price: self.entry_price,
            exit_price,
            entry_time: self.entry_time,
            exit_time,
            entry_index: self.entry_index,
            exit_index,
            pnl,
            return_pct,
            fees: entry_fees + exit_fees,
        }
    }
}

//a finished round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub size: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_index: usize,
    pub exit_index: usize,
    pub pnl: f64,
    //pnl relative to the entry cost basis, as a fraction
    pub return_pct: f64,
    pub fees: f64,
}

impl ClosedTrade {
    pub fn holding_hours(&self) -> f64 {
        (self.exit_time - self.entry_time).num_seconds() as f64 / 3600.0
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

//aggregate view of the open lots, as strategies see it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    //net quantity (positive for long, negative for short, 0 for flat)
    pub net_qty: i64,

    //size-weighted entry price of the open lots
    pub avg_entry_price: f64,

    pub unrealized_pnl: f64,
}

impl Position {
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>, price: f64) -> Self {
        let mut net_qty = 0;
        let mut cost = 0.0;
        let mut unrealized_pnl = 0.0;
        for trade in trades {
            net_qty += trade.size;
            cost += trade.entry_price * trade.size as f64;
            unrealized_pnl += trade.unrealized_pnl(price);
        }
        let avg_entry_price = if net_qty != 0 {
            cost / net_qty as f64
        } else {
            0.0
        };
        Position {
            net_qty,
            avg_entry_price,
            unrealized_pnl,
        }
    }

    //returns true if the position is flat (no open position)
    pub fn is_flat(&self) -> bool {
        self.net_qty == 0
    }

    pub fn is_long(&self) -> bool {
        self.net_qty > 0
    }

    pub fn is_short(&self) -> bool {
        self.net_qty < 0
    }
}
