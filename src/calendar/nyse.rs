use crate::calendar::base::TradingCalendar;
use crate::errors::{Result, DataHubError};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use log::debug;

const FIRST_SUPPORTED_YEAR: i32 = 1990;
const LAST_SUPPORTED_YEAR: i32 = 2099;

/// 不按规则计算的临时休市日
const SPECIAL_CLOSURES: [(i32, u32, u32); 11] = [
    (1994, 4, 27),  // Nixon funeral
    (2001, 9, 11),  // 9/11
    (2001, 9, 12),
    (2001, 9, 13),
    (2001, 9, 14),
    (2004, 6, 11),  // Reagan funeral
    (2007, 1, 2),   // Ford funeral
    (2012, 10, 29), // Hurricane Sandy
    (2012, 10, 30),
    (2018, 12, 5),  // George H. W. Bush funeral
    (2025, 1, 9),   // Carter funeral
];

/// 纽约证券交易所交易日历，按规则计算全天休市的节假日
pub struct NyseCalendar;

impl NyseCalendar {
    pub fn new() -> Self {
        Self
    }

    /// All full-day NYSE closures that fall on weekdays of the given year
    pub fn holidays(year: i32) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(12);

        // 元旦：周日顺延到周一，周六不在前一年的12月31日补休
        let new_year = ymd(year, 1, 1);
        match new_year.weekday() {
            Weekday::Sun => days.push(ymd(year, 1, 2)),
            Weekday::Sat => {}
            _ => days.push(new_year),
        }

        if year >= 1998 {
            days.push(nth_weekday(year, 1, Weekday::Mon, 3));
        }
        days.push(nth_weekday(year, 2, Weekday::Mon, 3));
        days.push(easter_sunday(year) - Duration::days(2));
        days.push(last_weekday(year, 5, Weekday::Mon));
        if year >= 2022 {
            days.push(observed(ymd(year, 6, 19)));
        }
        days.push(observed(ymd(year, 7, 4)));
        days.push(nth_weekday(year, 9, Weekday::Mon, 1));
        days.push(nth_weekday(year, 11, Weekday::Thu, 4));
        days.push(observed(ymd(year, 12, 25)));

        days.extend(
            SPECIAL_CLOSURES
                .iter()
                .filter(|(y, _, _)| *y == year)
                .map(|&(y, m, d)| ymd(y, m, d)),
        );

        days.sort();
        days
    }
}

impl Default for NyseCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl TradingCalendar for NyseCalendar {
    fn exchange_code(&self) -> &'static str {
        "NYSE"
    }

    fn is_trading_day(&self, date: NaiveDate) -> Result<bool> {
        if !(FIRST_SUPPORTED_YEAR..=LAST_SUPPORTED_YEAR).contains(&date.year()) {
            return Err(DataHubError::CalendarError(format!(
                "NYSE calendar has no data for {} (supported {}-{})",
                date, FIRST_SUPPORTED_YEAR, LAST_SUPPORTED_YEAR
            )));
        }

        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(false);
        }

        let is_holiday = Self::holidays(date.year()).contains(&date);
        if is_holiday {
            debug!("{} is an NYSE holiday", date);
        }
        Ok(!is_holiday)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// 周六节假日提前到周五，周日节假日顺延到周一
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = ymd(year, month, 1);
    let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    first + Duration::days(i64::from(offset + 7 * (n - 1)))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let last = if month == 12 {
        ymd(year, 12, 31)
    } else {
        ymd(year, month + 1, 1) - Duration::days(1)
    };
    let offset = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    last - Duration::days(i64::from(offset))
}

// Anonymous Gregorian computus
fn easter_sunday(year: i32) -> NaiveDate {
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
    ymd(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_open(y: i32, m: u32, d: u32) -> bool {
        NyseCalendar::new().is_trading_day(ymd(y, m, d)).unwrap()
    }

    #[test]
    fn computes_2024_holidays() {
        let expected = vec![
            ymd(2024, 1, 1),
            ymd(2024, 1, 15),
            ymd(2024, 2, 19),
            ymd(2024, 3, 29),
            ymd(2024, 5, 27),
            ymd(2024, 6, 19),
            ymd(2024, 7, 4),
            ymd(2024, 9, 2),
            ymd(2024, 11, 28),
            ymd(2024, 12, 25),
        ];
        assert_eq!(NyseCalendar::holidays(2024), expected);
    }

    #[test]
    fn easter_dates() {
        assert_eq!(easter_sunday(2019), ymd(2019, 4, 21));
        assert_eq!(easter_sunday(2024), ymd(2024, 3, 31));
        assert_eq!(easter_sunday(2025), ymd(2025, 4, 20));
    }

    #[test]
    fn weekends_are_closed() {
        assert!(!is_open(2024, 3, 9));
        assert!(!is_open(2024, 3, 10));
        assert!(is_open(2024, 3, 11));
    }

    #[test]
    fn observed_rules() {
        // Christmas 2021 on a Saturday, observed Friday the 24th
        assert!(!is_open(2021, 12, 24));
        // New Year 2022 on a Saturday is not observed on Dec 31
        assert!(is_open(2021, 12, 31));
        // New Year 2023 on a Sunday, observed Monday
        assert!(!is_open(2023, 1, 2));
        // Juneteenth 2022 on a Sunday, observed Monday
        assert!(!is_open(2022, 6, 20));
        // Juneteenth was not an NYSE holiday before 2022
        assert!(is_open(2021, 6, 18));
    }

    #[test]
    fn special_closures() {
        assert!(!is_open(2012, 10, 29));
        assert!(!is_open(2025, 1, 9));
        assert!(is_open(2025, 1, 10));
    }

    #[test]
    fn rejects_dates_outside_supported_range() {
        let calendar = NyseCalendar::new();
        let err = calendar.is_trading_day(ymd(1989, 12, 29)).unwrap_err();
        assert!(matches!(err, DataHubError::CalendarError(_)));
        assert!(calendar.is_trading_day(ymd(2100, 1, 4)).is_err());
    }
}
