//! Database row types and the on-disk encoding of event instants.
use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

const MILLIS_PER_SECOND: i64 = 1_000;

/// Split an instant into `(event_date, event_time)` columns: epoch millis of
/// the date's midnight, and millis since midnight.
pub fn split_instant(at: NaiveDateTime) -> (i64, i64) {
    let date_ms = at
        .date()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis();
    let time_ms = at.time().num_seconds_from_midnight() as i64 * MILLIS_PER_SECOND
        + (at.time().nanosecond() / 1_000_000) as i64;
    (date_ms, time_ms)
}

/// Inverse of [`split_instant`]. `None` when either column is out of range.
pub fn join_instant(date_ms: i64, time_ms: i64) -> Option<NaiveDateTime> {
    let date = DateTime::from_timestamp_millis(date_ms)?.naive_utc().date();
    let secs = u32::try_from(time_ms.div_euclid(MILLIS_PER_SECOND)).ok()?;
    let nanos = u32::try_from(time_ms.rem_euclid(MILLIS_PER_SECOND) * 1_000_000).ok()?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)?;
    Some(date.and_time(time))
}
