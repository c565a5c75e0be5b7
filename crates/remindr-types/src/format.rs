use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Month/day/year, zero padded. Independent of the user's locale.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// 12-hour clock with an AM/PM marker, e.g. `09:00 AM`.
pub const TIME_FORMAT: &str = "%I:%M %p";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// `MM/dd/yyyy hh:mm a` rendering used in listings and log lines.
pub fn format_instant(at: NaiveDateTime) -> String {
    format!("{} {}", format_date(at.date()), format_time(at.time()))
}
