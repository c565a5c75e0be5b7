use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use remindr_db::{Database, StoreError};
use remindr_types::{Event, EventId, ReminderKey, User, UserId};

use crate::clock::Clock;
use crate::credentials::{hash_password, verify_password};
use crate::error::{AuthError, FlowError};
use crate::platform::PendingWakeup;
use crate::scheduler::{ReminderOutcome, ReminderScheduler};
use crate::validator::validate;

// -- Accounts --

pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (username, password) = require_credentials(username, password)?;
        let password_hash = hash_password(password)?;

        let id = self
            .db
            .create_user(username, &password_hash)
            .map_err(|e| match e {
                StoreError::Duplicate => AuthError::UsernameTaken,
                other => AuthError::Storage(other),
            })?;

        info!("Registered user {} ({})", username, id);
        Ok(User {
            id,
            username: username.to_string(),
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (username, password) = require_credentials(username, password)?;
        let row = self
            .db
            .get_user_by_username(username)
            .map_err(AuthError::Storage)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &row.password_hash) {
            warn!("Failed login for {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(User {
            id: row.id,
            username: row.username,
        })
    }
}

fn require_credentials<'a>(
    username: &'a str,
    password: &'a str,
) -> Result<(&'a str, &'a str), AuthError> {
    let username = username.trim();
    let password = password.trim();
    if username.is_empty() {
        return Err(AuthError::FieldRequired("username"));
    }
    if password.is_empty() {
        return Err(AuthError::FieldRequired("password"));
    }
    Ok((username, password))
}

// -- Events --

/// Raw input for creating an event.
#[derive(Debug, Clone)]
pub struct NewEventRequest {
    pub user_id: UserId,
    pub name: String,
    pub date: String,
    pub time: String,
    pub reminder: bool,
}

/// Raw input for editing an event. `reminder` re-opts in; without it the
/// event's pending reminder is cancelled and not replaced.
#[derive(Debug, Clone)]
pub struct EditEventRequest {
    pub event_id: EventId,
    pub user_id: UserId,
    pub name: String,
    pub date: String,
    pub time: String,
    pub reminder: bool,
}

/// A persisted event plus what happened to its reminder, if one was asked for.
/// A reminder failure never undoes the save.
#[derive(Debug, Clone)]
pub struct SavedEvent {
    pub event: Event,
    pub reminder: Option<ReminderOutcome>,
}

/// What one [`EventService::sync_reminders`] pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderSync {
    /// Wake-ups registered or replaced
    pub armed: usize,
    /// Wake-ups revoked because their event was deleted, disarmed or
    /// could not be rescheduled
    pub cancelled: usize,
    /// Requests whose moment passed while nothing was pending
    pub retired: usize,
}

impl ReminderSync {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub struct EventService {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    reminders: ReminderScheduler,
}

impl EventService {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, reminders: ReminderScheduler) -> Self {
        Self {
            db,
            clock,
            reminders,
        }
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn create(&self, req: &NewEventRequest) -> Result<SavedEvent, FlowError> {
        let accepted = validate(&req.name, &req.date, &req.time, self.clock.now())?;

        if self
            .db
            .event_exists(req.user_id, &accepted.name, accepted.occurs_at)
            .map_err(log_store_error)?
        {
            return Err(FlowError::Duplicate);
        }

        let id = self
            .db
            .insert_event(req.user_id, &accepted.name, accepted.occurs_at, req.reminder)
            .map_err(log_store_error)?;

        let event = Event {
            id,
            user_id: req.user_id,
            name: accepted.name,
            occurs_at: accepted.occurs_at,
            reminder_requested: req.reminder,
        };
        info!("Saved event {} for user {}", event.id, event.user_id);

        let reminder = req.reminder.then(|| self.reminders.request(&event));
        Ok(SavedEvent { event, reminder })
    }

    /// Events for `user_id`, earliest first.
    pub fn list(&self, user_id: UserId) -> Result<Vec<Event>, FlowError> {
        self.db.list_events_by_user(user_id).map_err(log_store_error)
    }

    pub fn edit(&self, req: &EditEventRequest) -> Result<SavedEvent, FlowError> {
        let accepted = validate(&req.name, &req.date, &req.time, self.clock.now())?;

        let existing = self
            .db
            .get_event(req.event_id, req.user_id)
            .map_err(log_store_error)?
            .ok_or(FlowError::NotFound)?;

        let updated = self
            .db
            .update_event(req.event_id, req.user_id, &accepted.name, accepted.occurs_at)
            .map_err(log_store_error)?;
        if !updated {
            return Err(FlowError::NotFound);
        }

        // The old wake-up carries the old time and name.
        self.reminders.cancel(&existing);
        if existing.reminder_requested != req.reminder {
            self.record_requested(existing.id, existing.user_id, req.reminder);
        }

        let event = Event {
            id: existing.id,
            user_id: existing.user_id,
            name: accepted.name,
            occurs_at: accepted.occurs_at,
            reminder_requested: req.reminder,
        };
        info!("Updated event {} for user {}", event.id, event.user_id);

        let reminder = req.reminder.then(|| self.reminders.request(&event));
        Ok(SavedEvent { event, reminder })
    }

    /// Delete the event and revoke its reminder.
    pub fn delete(&self, event_id: EventId, user_id: UserId) -> Result<(), FlowError> {
        let deleted = self
            .db
            .delete_event(event_id, user_id)
            .map_err(log_store_error)?;
        if !deleted {
            return Err(FlowError::NotFound);
        }

        self.reminders.cancel_key(ReminderKey::for_event(event_id));
        info!("Deleted event {} for user {}", event_id, user_id);
        Ok(())
    }

    /// Bring the platform's wake-ups for `user_id` in line with the store.
    ///
    /// Other processes change events behind this one, so the stored
    /// `reminder_requested` flag is authoritative:
    /// - a requested future event gets a wake-up matching its current name
    ///   and instant, registered without prompting;
    /// - a wake-up whose event is gone or no longer requested is revoked;
    /// - a requested event whose moment passed with nothing pending is
    ///   cleared, since it can no longer fire.
    ///
    /// Wake-ups owned by other users are left alone.
    pub fn sync_reminders(&self, user_id: UserId) -> Result<ReminderSync, FlowError> {
        let now = self.clock.now();
        let mut report = ReminderSync::default();
        let mut keep = HashSet::new();

        for event in self.list(user_id)?.into_iter().filter(|e| e.reminder_requested) {
            let key = event.reminder_key();

            if event.occurs_at < now {
                if self.reminders.is_pending(key) {
                    // due; the delivery pass takes it
                    keep.insert(key);
                } else {
                    self.record_requested(event.id, user_id, false);
                    report.retired += 1;
                }
                continue;
            }

            keep.insert(key);
            let wanted = PendingWakeup {
                trigger_at: event.occurs_at,
                payload: event.reminder_payload(),
            };
            if self.reminders.pending(key).as_ref() == Some(&wanted) {
                continue;
            }

            match self.reminders.restore(&event) {
                Some(ReminderOutcome::Scheduled(_)) => report.armed += 1,
                // a stale wake-up must not outlive a failed reschedule
                _ => {
                    if self.reminders.cancel_key(key) {
                        report.cancelled += 1;
                    }
                }
            }
        }

        for key in self.reminders.pending_keys() {
            if keep.contains(&key) {
                continue;
            }
            let owner = self.db.event_owner(key.event_id()).map_err(log_store_error)?;
            if owner.is_some_and(|owner| owner != user_id) {
                continue;
            }
            if self.reminders.cancel_key(key) {
                report.cancelled += 1;
            }
        }

        if !report.is_noop() {
            info!(
                "Reminder sync for user {}: {} armed, {} cancelled, {} retired",
                user_id, report.armed, report.cancelled, report.retired
            );
        }
        Ok(report)
    }

    /// Clear the request of an event whose reminder has fired.
    pub fn complete_reminder(&self, key: ReminderKey, user_id: UserId) {
        self.record_requested(key.event_id(), user_id, false);
    }

    fn record_requested(&self, event_id: EventId, user_id: UserId, requested: bool) {
        if let Err(e) = self.db.set_reminder_requested(event_id, user_id, requested) {
            warn!("Could not record reminder state for event {}: {}", event_id, e);
        }
    }
}

fn log_store_error(err: StoreError) -> FlowError {
    if !matches!(err, StoreError::Duplicate) {
        error!("Event store failure: {}", err);
    }
    FlowError::from(err)
}
