use chrono::{Days, NaiveDate};

/// Shift a date by a signed number of days.
/// `None` when the result falls outside the representable calendar.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let step = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(step)
    } else {
        date.checked_sub_days(step)
    }
}

/// Whole days from `earlier` to `later`. Negative when `later` comes first.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// iCalendar `DATE` value (`YYYYMMDD`).
pub fn ics_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Exclusive end date for an inclusive all-day range.
/// Saturates at the last representable date.
pub fn exclusive_end(inclusive_end: NaiveDate) -> NaiveDate {
    inclusive_end.succ_opt().unwrap_or(inclusive_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn days_between_is_signed() {
        assert_eq!(days_between(date("2024-01-01"), date("2024-01-30")), 29);
        assert_eq!(days_between(date("2024-01-30"), date("2024-01-01")), -29);
    }

    #[test]
    fn add_days_crosses_leap_day() {
        assert_eq!(add_days(date("2024-02-25"), 5), Some(date("2024-03-01")));
        assert_eq!(add_days(date("2024-03-01"), -1), Some(date("2024-02-29")));
    }

    #[test]
    fn add_days_out_of_range_is_none() {
        assert_eq!(add_days(NaiveDate::MAX, 1), None);
        assert_eq!(add_days(NaiveDate::MIN, -1), None);
        assert_eq!(add_days(date("2024-01-01"), i64::from(u32::MAX)), None);
        assert_eq!(add_days(date("2024-01-01"), i64::MIN), None);
        assert_eq!(add_days(NaiveDate::MAX, 0), Some(NaiveDate::MAX));
    }

    #[test]
    fn exclusive_end_saturates() {
        assert_eq!(exclusive_end(date("2024-02-28")), date("2024-02-29"));
        assert_eq!(exclusive_end(NaiveDate::MAX), NaiveDate::MAX);
    }

    #[test]
    fn ics_date_has_no_separators() {
        assert_eq!(ics_date(date("2024-01-09")), "20240109");
        assert_eq!(ics_date(exclusive_end(date("2024-12-31"))), "20250101");
    }
}
