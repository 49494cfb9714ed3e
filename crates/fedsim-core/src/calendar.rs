//! Calendar helpers. One tick is one simulated month.

use chrono::{Datelike, Months, NaiveDate};

/// Default first month of play.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Advance `date` by whole months, saturating at the calendar's end.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Whole calendar months from `start` to `end` (negative if `end` is earlier).
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

/// Calendar quarter (1..=4) of `date`.
pub fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}

/// Short chart label, e.g. `Q2 '24`.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("Q{} '{:02}", quarter_of(date), date.year().rem_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn months_accumulate_across_years() {
        let start = default_start_date();
        let end = add_months(start, 48);
        assert_eq!(end, ymd(2028, 1, 1));
        assert_eq!(months_between(start, end), 48);
        assert_eq!(months_between(start, add_months(start, 96)), 96);
    }

    #[test]
    fn quarters_and_labels() {
        assert_eq!(quarter_of(ymd(2024, 1, 1)), 1);
        assert_eq!(quarter_of(ymd(2024, 3, 1)), 1);
        assert_eq!(quarter_of(ymd(2024, 4, 1)), 2);
        assert_eq!(quarter_of(ymd(2024, 12, 1)), 4);
        assert_eq!(quarter_label(ymd(2024, 4, 1)), "Q2 '24");
        assert_eq!(quarter_label(ymd(2031, 10, 1)), "Q4 '31");
    }
}
