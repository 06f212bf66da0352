//! Slovenian public holidays, as they affect the dual-tariff schedules.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Easter Sunday by the anonymous Gregorian computus.
#[must_use]
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
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
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

const FIXED_HOLIDAYS: [(u32, u32); 12] = [
    (1, 1),   // New Year
    (1, 2),   // New Year
    (2, 8),   // Prešeren Day
    (4, 27),  // Day of Uprising Against Occupation
    (5, 1),   // Labour Day
    (5, 2),   // Labour Day
    (6, 25),  // Statehood Day
    (8, 15),  // Assumption Day
    (10, 31), // Reformation Day
    (11, 1),  // Remembrance Day
    (12, 25), // Christmas
    (12, 26), // Independence and Unity Day
];

#[must_use]
pub fn is_public_holiday(date: NaiveDate) -> bool {
    let is_fixed = FIXED_HOLIDAYS
        .iter()
        .any(|&(month, day)| date.month() == month && date.day() == day);
    if is_fixed {
        return true;
    }
    easter_sunday(date.year()).is_some_and(|easter| {
        // Easter Sunday, Easter Monday, and Whit Sunday.
        [Days::new(0), Days::new(1), Days::new(49)]
            .into_iter()
            .filter_map(|offset| easter.checked_add_days(offset))
            .any(|holiday| holiday == date)
    })
}

#[must_use]
pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_public_holiday(date)
}
