//per-day minute-grid reindexing and deterministic gap filling
//days are folded in calendar order; the last known close is the only carried state

use crate::align::session::{SessionBar, SessionWindow};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use std::collections::HashMap;

//one slot of the minute grid; prices stay optional until the finalizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBar {
    pub timestamp: DateTime<Tz>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: f64,
}

impl GridBar {
    fn empty(timestamp: DateTime<Tz>) -> Self {
        GridBar {
            timestamp,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: f64::NAN,
        }
    }

    fn from_session(timestamp: DateTime<Tz>, bar: &SessionBar) -> Self {
        GridBar {
            timestamp,
            open: present(bar.open),
            high: present(bar.high),
            low: present(bar.low),
            close: present(bar.close),
            volume: bar.volume,
        }
    }
}

fn present(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

//accumulator threaded through the per-day fold
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayFold {
    pub prior_close: Option<f64>,
}

impl DayFold {
    pub fn seeded(seed_close: Option<f64>) -> Self {
        DayFold {
            prior_close: seed_close.filter(|c| !c.is_nan()),
        }
    }

    //fills one trading day and hands back the accumulator for the next one
    //`bars` is the full session-filtered input, sorted ascending
    pub fn fill_day(
        self,
        day: NaiveDate,
        bars: &[SessionBar],
        session: &SessionWindow,
    ) -> (DayFold, Vec<GridBar>) {
        let grid = session.grid(day);

        //bars of this local date, keyed by exact timestamp; last one wins
        let lo = bars.partition_point(|b| b.date() < day);
        let hi = lo + bars[lo..].partition_point(|b| b.date() == day);
        let by_time: HashMap<DateTime<Tz>, &SessionBar> =
            bars[lo..hi].iter().map(|b| (b.timestamp, b)).collect();

        let mut rows: Vec<GridBar> = grid
            .iter()
            .map(|ts| match by_time.get(ts) {
                Some(bar) => GridBar::from_session(*ts, bar),
                None => GridBar::empty(*ts),
            })
            .collect();

        let mut prior_close = self.prior_close;
        let whole_day_missing = rows.iter().all(|r| r.close.is_none());
        let leading_missing = rows.first().map_or(false, |r| r.close.is_none());

        if leading_missing {
            //latest real close before this session opens, even outside the requested span
            let earlier = session.session_start(day).and_then(|start| {
                let before = bars.partition_point(|b| b.timestamp < start);
                bars[..before].iter().rev().find(|b| b.has_close()).map(|b| b.close)
            });
            prior_close = if whole_day_missing {
                earlier.or(prior_close)
            } else {
                prior_close.or(earlier)
            };
        }

        if whole_day_missing {
            if let Some(seed) = prior_close {
                for row in rows.iter_mut() {
                    row.close = Some(seed);
                }
            }
        } else if leading_missing {
            //the leading gap takes the earlier close, or the day's own first close when there is none
            let first_close = rows.iter().find_map(|r| r.close);
            if let Some(seed) = prior_close.or(first_close) {
                for row in rows.iter_mut().take_while(|r| r.close.is_none()) {
                    row.close = Some(seed);
                }
            }
        }

        //forward-fill close within the day
        let mut last = None;
        for row in rows.iter_mut() {
            match row.close {
                Some(close) => last = Some(close),
                None => row.close = last,
            }
        }

        for row in rows.iter_mut() {
            row.open = row.open.or(row.close);
            row.high = row.high.or(row.close);
            row.low = row.low.or(row.close);
            if row.volume.is_nan() {
                row.volume = 0.0;
            }
        }

        if let Some(close) = rows.last().and_then(|r| r.close) {
            prior_close = Some(close);
        }

        (DayFold { prior_close }, rows)
    }
}

//reindexes every trading day onto the session grid and fills its gaps
//`bars` must be sorted ascending
pub fn fill_missing_minutes(
    bars: &[SessionBar],
    trading_days: &[NaiveDate],
    session: &SessionWindow,
    seed_close: Option<f64>,
) -> Vec<GridBar> {
    let capacity = trading_days.len() * session.bars_per_day();
    let (_, rows) = trading_days.iter().fold(
        (DayFold::seeded(seed_close), Vec::with_capacity(capacity)),
        |(fold, mut rows), day| {
            let (next, day_rows) = fold.fill_day(*day, bars, session);
            rows.extend(day_rows);
            (next, rows)
        },
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn session() -> SessionWindow {
        SessionWindow::default()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32, close: f64) -> SessionBar {
        let ts = chrono_tz::America::New_York
            .with_ymd_and_hms(2024, 1, d, h, m, 0)
            .unwrap();
        SessionBar {
            timestamp: ts,
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn full_gap_day_takes_prior_close() {
        let bars = vec![at(2, 15, 59, 10.0)];
        let rows = fill_missing_minutes(&bars, &[day(2), day(3)], &session(), None);
        assert_eq!(rows.len(), 780);

        let day3 = &rows[390..];
        assert!(day3.iter().all(|r| r.close == Some(10.0)
            && r.open == Some(10.0)
            && r.high == Some(10.0)
            && r.low == Some(10.0)
            && r.volume == 0.0));
    }

    #[test]
    fn partial_gap_forward_fills() {
        let bars: Vec<SessionBar> = (30..36).map(|m| at(2, 9, m, 5.0)).collect();
        let rows = fill_missing_minutes(&bars, &[day(2)], &session(), None);
        assert_eq!(rows.len(), 390);

        //09:30..09:35 are real
        assert_eq!(rows[0].volume, 100.0);
        assert_eq!(rows[5].high, Some(5.5));
        //09:36 onwards synthetic
        for row in &rows[6..] {
            assert_eq!(row.close, Some(5.0));
            assert_eq!(row.open, Some(5.0));
            assert_eq!(row.volume, 0.0);
        }
        assert_eq!(
            rows[389].timestamp.time(),
            NaiveTime::from_hms_opt(15, 59, 0).unwrap()
        );
    }

    #[test]
    fn leading_gap_of_partial_day_takes_prior_close() {
        let bars = vec![at(2, 15, 59, 10.0), at(3, 10, 0, 11.0)];
        let rows = fill_missing_minutes(&bars, &[day(2), day(3)], &session(), None);
        let day3 = &rows[390..];
        assert!(day3[..30]
            .iter()
            .all(|r| r.close == Some(10.0) && r.open == Some(10.0) && r.volume == 0.0));
        assert!(day3[30..].iter().all(|r| r.close == Some(11.0)));
    }

    #[test]
    fn first_day_of_span_rescans_earlier_bars() {
        //the 01-02 bar is outside the calendar span but still precedes it
        let bars = vec![at(2, 15, 59, 5.0), at(3, 10, 0, 6.0)];
        let rows = fill_missing_minutes(&bars, &[day(3)], &session(), None);
        assert_eq!(rows.len(), 390);
        assert!(rows[..30].iter().all(|r| r.close == Some(5.0)));
        assert!(rows[30..].iter().all(|r| r.close == Some(6.0)));
    }

    #[test]
    fn late_first_bar_without_history_fills_from_its_own_day() {
        let bars = vec![at(2, 9, 31, 4.0)];
        let rows = fill_missing_minutes(&bars, &[day(2), day(3)], &session(), None);
        assert_eq!(rows[0].close, Some(4.0));
        assert_eq!(rows[0].low, Some(4.0));
        assert_eq!(rows[0].volume, 0.0);
        assert_eq!(rows[1].low, Some(3.5));
        assert!(rows.iter().all(|r| r.close == Some(4.0)));
    }

    #[test]
    fn empty_history_without_seed_stays_missing() {
        let rows = fill_missing_minutes(&[], &[day(2)], &session(), None);
        assert_eq!(rows.len(), 390);
        assert!(rows.iter().all(|r| r.close.is_none() && r.volume == 0.0));
    }

    #[test]
    fn seed_close_fills_first_empty_day() {
        let rows = fill_missing_minutes(&[], &[day(2)], &session(), Some(7.25));
        assert!(rows.iter().all(|r| r.close == Some(7.25) && r.low == Some(7.25)));
    }

    #[test]
    fn prior_close_chains_across_empty_days() {
        let bars = vec![at(2, 12, 0, 3.0)];
        let rows = fill_missing_minutes(&bars, &[day(2), day(3), day(4)], &session(), None);
        assert_eq!(rows.len(), 1170);
        assert!(rows[390..].iter().all(|r| r.close == Some(3.0)));
    }

    #[test]
    fn rescan_uses_bars_outside_the_calendar() {
        //a bar on a date the calendar skips still seeds the next empty day
        let bars = vec![at(2, 15, 0, 4.0), at(3, 11, 0, 6.0)];
        let rows = fill_missing_minutes(&bars, &[day(2), day(4)], &session(), None);
        assert!(rows[390..].iter().all(|r| r.close == Some(6.0)));
    }

    #[test]
    fn duplicate_minutes_keep_last() {
        let mut second = at(2, 9, 30, 9.0);
        second.volume = 1.0;
        let bars = vec![at(2, 9, 30, 8.0), second];
        let rows = fill_missing_minutes(&bars, &[day(2)], &session(), None);
        assert_eq!(rows[0].close, Some(9.0));
        assert_eq!(rows[0].volume, 1.0);
    }

    #[test]
    fn missing_close_inside_real_bar_is_forward_filled() {
        let mut hole = at(2, 9, 31, 0.0);
        hole.close = f64::NAN;
        hole.open = 2.5;
        let bars = vec![at(2, 9, 30, 2.0), hole];
        let rows = fill_missing_minutes(&bars, &[day(2)], &session(), None);
        assert_eq!(rows[1].close, Some(2.0));
        //real open is kept, only missing fields come from close
        assert_eq!(rows[1].open, Some(2.5));
    }

    #[test]
    fn output_is_deterministic() {
        let bars: Vec<SessionBar> = (0..50).map(|i| at(2, 10, i, 1.0 + i as f64)).collect();
        let days = [day(2), day(3)];
        let a = fill_missing_minutes(&bars, &days, &session(), None);
        let b = fill_missing_minutes(&bars, &days, &session(), None);
        assert_eq!(a, b);
    }
}
