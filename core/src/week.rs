use chrono::{Datelike, Duration, Local, NaiveDate};

/// The seven dates, Monday through Sunday, of the week `offset` weeks away
/// from the week containing `today`. A Sunday is the last day of its week.
#[must_use]
pub fn week_dates(today: NaiveDate, offset: i64) -> [NaiveDate; 7] {
    let back = i64::from(today.weekday().num_days_from_monday());
    let monday = today - Duration::days(back) + Duration::weeks(offset);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

#[must_use]
pub fn current_week_dates(offset: i64) -> [NaiveDate; 7] {
    week_dates(Local::now().date_naive(), offset)
}

/// Storage key for a week: its Monday as `YYYY-MM-DD`.
#[must_use]
pub fn week_key(today: NaiveDate, offset: i64) -> String {
    monday_key(week_dates(today, offset)[0])
}

#[must_use]
pub fn monday_key(monday: NaiveDate) -> String {
    monday.format("%Y-%m-%d").to_string()
}

/// `"Feb 9 – 15, 2026"`, or `"Jan 26 – Feb 1, 2026"` when the week spans two months.
#[must_use]
pub fn format_week_range(dates: &[NaiveDate; 7]) -> String {
    let first = dates[0];
    let last = dates[6];
    let m1 = first.format("%b");
    let year = first.year();
    if first.month() == last.month() {
        format!("{m1} {} \u{2013} {}, {year}", first.day(), last.day())
    } else {
        let m2 = last.format("%b");
        format!("{m1} {} \u{2013} {m2} {}, {year}", first.day(), last.day())
    }
}
