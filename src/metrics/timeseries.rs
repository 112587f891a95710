use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

//a point in the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
    pub drawdown: f64,
    pub returns: f64,
}

impl EquityPoint {
    pub fn new(timestamp: NaiveDateTime, equity: f64, drawdown: f64, returns: f64) -> Self {
        EquityPoint {
            timestamp,
            equity,
            drawdown,
            returns,
        }
    }
}

//calculates the equity curve with drawdowns
pub fn calculate_equity_curve(
    timestamps: &[NaiveDateTime],
    equity_values: &[f64],
    initial_balance: f64,
) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(timestamps.len());
    let mut peak = initial_balance;
    let mut prev_equity = initial_balance;

    for (i, (&timestamp, &equity)) in timestamps.iter().zip(equity_values.iter()).enumerate() {
        //update peak
        if equity > peak {
            peak = equity;
        }

        let drawdown = if peak > 0.0 {
            (peak - equity) / peak
        } else {
            0.0
        };

        let returns = if i == 0 || prev_equity == 0.0 {
            0.0
        } else {
            (equity - prev_equity) / prev_equity
        };

        curve.push(EquityPoint::new(timestamp, equity, drawdown, returns));
        prev_equity = equity;
    }

    curve
}

//calculates maximum drawdown from equity curve
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::max)
}

//calculates returns from equity values
pub fn calculate_returns(equity_values: &[f64]) -> Vec<f64> {
    equity_values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

//closing equity of each calendar day, in order
pub fn daily_equity(equity_curve: &[EquityPoint]) -> Vec<(NaiveDate, f64)> {
    let mut days: Vec<(NaiveDate, f64)> = Vec::new();
    for point in equity_curve {
        let day = point.timestamp.date();
        match days.last_mut() {
            Some((last, equity)) if *last == day => *equity = point.equity,
            _ => days.push((day, point.equity)),
        }
    }
    days
}

//day-over-day returns of the closing equity
pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let closes: Vec<f64> = daily_equity(equity_curve).into_iter().map(|(_, e)| e).collect();
    calculate_returns(&closes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn drawdown_tracks_the_running_peak() {
        let curve = calculate_equity_curve(&[ts(2, 10), ts(2, 11), ts(2, 12)], &[110.0, 88.0, 99.0], 100.0);
        assert_eq!(curve[0].drawdown, 0.0);
        assert!((curve[1].drawdown - 0.2).abs() < 1e-12);
        assert!((curve[1].returns + 0.2).abs() < 1e-12);
        assert!((max_drawdown(&curve) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn daily_returns_use_the_last_point_of_each_day() {
        let curve = calculate_equity_curve(
            &[ts(2, 10), ts(2, 15), ts(3, 10), ts(3, 15), ts(4, 15)],
            &[100.0, 110.0, 90.0, 121.0, 108.9],
            100.0,
        );
        let days = daily_equity(&curve);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].1, 110.0);
        let returns = daily_returns(&curve);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
    }
}
