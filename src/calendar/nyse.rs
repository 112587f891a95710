use crate::calendar::TradingCalendar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

//unscheduled full-day closures that no rule predicts
const SPECIAL_CLOSURES: [(i32, u32, u32); 11] = [
    (1994, 4, 27),  //nixon funeral
    (2001, 9, 11),  //sept 11
    (2001, 9, 12),
    (2001, 9, 13),
    (2001, 9, 14),
    (2004, 6, 11),  //reagan funeral
    (2007, 1, 2),   //ford funeral
    (2012, 10, 29), //hurricane sandy
    (2012, 10, 30),
    (2018, 12, 5),  //g.h.w. bush funeral
    (2025, 1, 9),   //carter funeral
];

//new york stock exchange regular calendar
//half days are ordinary trading days here, the minute grid stays full length
#[derive(Debug, Clone, Copy, Default)]
pub struct NyseCalendar;

impl NyseCalendar {
    pub fn new() -> Self {
        NyseCalendar
    }

    //full-day holidays of one year, in date order
    pub fn holidays(year: i32) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(12);

        //new year's day: a saturday holiday is not moved to the prior friday
        if let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) {
            match jan1.weekday() {
                Weekday::Sat => {}
                Weekday::Sun => days.push(jan1 + Duration::days(1)),
                _ => days.push(jan1),
            }
        }

        if year >= 1998 {
            days.extend(NaiveDate::from_weekday_of_month_opt(year, 1, Weekday::Mon, 3));
        }
        days.extend(NaiveDate::from_weekday_of_month_opt(year, 2, Weekday::Mon, 3));
        days.extend(easter_sunday(year).map(|easter| easter - Duration::days(2)));
        days.extend(last_weekday_of_month(year, 5, Weekday::Mon));
        if year >= 2022 {
            days.extend(observed(year, 6, 19));
        }
        days.extend(observed(year, 7, 4));
        days.extend(NaiveDate::from_weekday_of_month_opt(year, 9, Weekday::Mon, 1));
        days.extend(NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4));
        days.extend(observed(year, 12, 25));

        days.extend(
            SPECIAL_CLOSURES
                .iter()
                .filter(|(y, _, _)| *y == year)
                .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        );

        days.sort();
        days.dedup();
        days
    }
}

impl TradingCalendar for NyseCalendar {
    fn name(&self) -> &str {
        "XNYS"
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            && !Self::holidays(date.year()).contains(&date)
    }
}

//fixed-date holiday moved off the weekend: saturday to friday, sunday to monday
fn observed(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    })
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = first_next - Duration::days(1);
    while day.weekday() != weekday {
        day -= Duration::days(1);
    }
    Some(day)
}

//anonymous gregorian computus
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2024), Some(d(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(d(2025, 4, 20)));
        assert_eq!(easter_sunday(2019), Some(d(2019, 4, 21)));
    }

    #[test]
    fn holidays_2024() {
        let want = vec![
            d(2024, 1, 1),
            d(2024, 1, 15),
            d(2024, 2, 19),
            d(2024, 3, 29),
            d(2024, 5, 27),
            d(2024, 6, 19),
            d(2024, 7, 4),
            d(2024, 9, 2),
            d(2024, 11, 28),
            d(2024, 12, 25),
        ];
        assert_eq!(NyseCalendar::holidays(2024), want);
    }

    #[test]
    fn full_years_have_expected_session_counts() {
        let cal = NyseCalendar::new();
        assert_eq!(cal.count(d(2024, 1, 1), d(2024, 12, 31)).unwrap(), 252);
        assert_eq!(cal.count(d(2023, 1, 1), d(2023, 12, 31)).unwrap(), 250);
    }

    #[test]
    fn weekend_observance() {
        let cal = NyseCalendar::new();
        //2021-12-25 is a saturday, observed friday 12-24
        assert!(!cal.is_trading_day(d(2021, 12, 24)));
        //2022-01-01 is a saturday and is not observed on 2021-12-31
        assert!(cal.is_trading_day(d(2021, 12, 31)));
        //2023-01-01 is a sunday, observed monday 01-02
        assert!(!cal.is_trading_day(d(2023, 1, 2)));
        //juneteenth only from 2022
        assert!(cal.is_trading_day(d(2021, 6, 18)));
        assert!(!cal.is_trading_day(d(2023, 6, 19)));
    }

    #[test]
    fn special_closures_are_skipped() {
        let cal = NyseCalendar::new();
        assert!(!cal.is_trading_day(d(2025, 1, 9)));
        assert!(!cal.is_trading_day(d(2012, 10, 29)));
        assert!(cal.is_trading_day(d(2012, 10, 31)));
    }
}
