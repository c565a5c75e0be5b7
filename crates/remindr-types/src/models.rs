use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::format::{format_date, format_time};
use crate::reminder::{ReminderKey, ReminderPayload};

pub type UserId = i64;
pub type EventId = i64;

/// A registered account. The password hash stays in the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A named event owned by one user.
///
/// `occurs_at` is a wall-clock instant on the local device clock; the store
/// splits it into a date part and a time part on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub user_id: UserId,
    pub name: String,
    pub occurs_at: NaiveDateTime,
    pub reminder_requested: bool,
}

impl Event {
    pub fn date_text(&self) -> String {
        format_date(self.occurs_at.date())
    }

    pub fn time_text(&self) -> String {
        format_time(self.occurs_at.time())
    }

    /// Scheduling key for this event's reminder. Derived from the durable id
    /// so renames and edits never orphan a pending wake-up.
    pub fn reminder_key(&self) -> ReminderKey {
        ReminderKey::for_event(self.id)
    }

    pub fn reminder_payload(&self) -> ReminderPayload {
        ReminderPayload::new(&self.name, self.date_text(), self.time_text())
    }
}
