use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::EventId;

/// Identity of a scheduled wake-up, regenerated from the owning event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderKey(EventId);

impl ReminderKey {
    pub fn for_event(event_id: EventId) -> Self {
        Self(event_id)
    }

    pub fn event_id(&self) -> EventId {
        self.0
    }
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

/// Data handed to the platform at schedule time and given back at trigger time.
///
/// Fields are optional because the platform round-trips them opaquely; the
/// deliverer refuses to render anything incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl ReminderPayload {
    pub fn new(name: impl Into<String>, date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            date: Some(date.into()),
            time: Some(time.into()),
        }
    }
}

/// Platform permissions a reminder depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// Posting a user-visible notification when the reminder fires
    PostNotification,
    /// Registering an exact one-shot wake-up
    ScheduleExactReminder,
}

impl CapabilityKind {
    /// Order in which a reminder attempt asks for capabilities.
    pub const REQUIRED: [CapabilityKind; 2] = [
        CapabilityKind::PostNotification,
        CapabilityKind::ScheduleExactReminder,
    ];
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::PostNotification => f.write_str("post notifications"),
            CapabilityKind::ScheduleExactReminder => f.write_str("schedule exact reminders"),
        }
    }
}
