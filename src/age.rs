//! Whole-years age from the loosely formatted birth dates the player
//! catalog carries.
//!
//! Dates and "today" are both taken in UTC; callers render `None` as
//! "unknown", never as zero.

use chrono::{Datelike, NaiveDate, Utc};

/// Parse a birth date in one of the two accepted shapes: `YYYY-MM-DD` or
/// `DD/MM/YYYY`. Anything else, including impossible calendar dates, is
/// `None`.
pub fn parse_birth_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .ok()
}

/// Completed years between the birth date and the current UTC date.
pub fn age_from_birth_date(input: &str) -> Option<u32> {
    age_on(input, Utc::now().date_naive())
}

/// Pure core of [`age_from_birth_date`]: completed years as of `today`,
/// decremented when the birthday has not occurred yet this year. Birth
/// dates after `today` are `None`.
pub fn age_on(input: &str, today: NaiveDate) -> Option<u32> {
    let birth = parse_birth_date(input)?;
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn iso_format_counts_completed_years() {
        let today = day(2026, 8, 6);
        assert_eq!(age_on("1990-08-06", today), Some(36));
        assert_eq!(age_on("1990-08-07", today), Some(35));
        assert_eq!(age_on("1990-12-31", today), Some(35));
        assert_eq!(age_on("1990-01-01", today), Some(36));
    }

    #[test]
    fn slash_format_is_day_month_year() {
        let today = day(2026, 8, 6);
        assert_eq!(age_on("06/08/1990", today), Some(36));
        assert_eq!(age_on("07/08/1990", today), Some(35));
        // 1st of February, not February the 1st month.
        assert_eq!(age_on("01/02/2000", today), Some(26));
    }

    #[test]
    fn malformed_shapes_are_unknown() {
        let today = day(2026, 8, 6);
        for bad in ["", "  ", "1990", "08-06-1990", "1990/08/06", "ayer", "1990-02-30"] {
            assert_eq!(age_on(bad, today), None, "{bad:?}");
        }
    }

    #[test]
    fn future_birth_dates_are_unknown() {
        let today = day(2026, 8, 6);
        assert_eq!(age_on("2027-01-01", today), None);
        assert_eq!(age_on("2026-08-07", today), None);
    }

    #[test]
    fn leap_day_birthday() {
        assert_eq!(age_on("2000-02-29", day(2026, 2, 28)), Some(25));
        assert_eq!(age_on("2000-02-29", day(2026, 3, 1)), Some(26));
    }
}
