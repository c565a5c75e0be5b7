use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use remindr_types::format::{DATE_FORMAT, TIME_FORMAT};

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 45;

/// Input field named in a [`ValidationError::FieldRequired`] rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Date,
    Time,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name => f.write_str("Event name"),
            Field::Date => f.write_str("Date"),
            Field::Time => f.write_str("Time"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    FieldRequired(Field),

    #[error("Event name must be at least 3 characters")]
    NameTooShort,

    #[error("Event name cannot exceed 45 characters")]
    NameTooLong,

    #[error("Enter the date as MM/DD/YYYY and the time as hh:mm AM/PM")]
    MalformedDateTime,

    #[error("Invalid time or date: the event must be in the future")]
    PastDateTime,
}

/// Input that passed every rule. `name` is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedEvent {
    pub name: String,
    pub occurs_at: NaiveDateTime,
}

/// Check raw event input against `now`.
///
/// Rules run in order and the first failure is returned: required fields,
/// name length, date/time format, then "not in the past". An instant equal
/// to `now` is accepted.
pub fn validate(
    name: &str,
    date: &str,
    time: &str,
    now: NaiveDateTime,
) -> Result<AcceptedEvent, ValidationError> {
    let name = name.trim();
    let date = date.trim();
    let time = time.trim();

    for (value, field) in [(name, Field::Name), (date, Field::Date), (time, Field::Time)] {
        if value.is_empty() {
            return Err(ValidationError::FieldRequired(field));
        }
    }

    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    if len > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong);
    }

    let occurs_at = parse_occurs_at(date, time)?;
    if occurs_at < now {
        return Err(ValidationError::PastDateTime);
    }

    Ok(AcceptedEvent {
        name: name.to_string(),
        occurs_at,
    })
}

/// Parse `MM/dd/yyyy` and `hh:mm AM|PM` into one instant.
pub fn parse_occurs_at(date: &str, time: &str) -> Result<NaiveDateTime, ValidationError> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::MalformedDateTime)?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| ValidationError::MalformedDateTime)?;
    Ok(date.and_time(time))
}
