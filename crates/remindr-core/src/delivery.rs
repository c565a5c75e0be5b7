use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use remindr_types::{CapabilityKind, ReminderKey, ReminderPayload, UserId};

use crate::clock::Clock;
use crate::platform::{CapabilityProvider, TimerScheduler};
use crate::service::EventService;

/// User-visible notification rendered from a reminder payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// Presents a notification to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, key: ReminderKey, notification: Notification);
}

/// Handles a wake-up at trigger time. Never touches the store: the event
/// may already be gone, and that is fine.
pub struct Deliverer {
    notifier: Arc<dyn Notifier>,
    capabilities: Arc<dyn CapabilityProvider>,
}

impl Deliverer {
    pub fn new(notifier: Arc<dyn Notifier>, capabilities: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            notifier,
            capabilities,
        }
    }

    /// Render and post the reminder. Returns false when the payload is
    /// incomplete or notifications are not permitted.
    pub fn deliver(&self, key: ReminderKey, payload: &ReminderPayload) -> bool {
        let Some(notification) = render(payload) else {
            warn!("Dropping reminder {}: payload is missing event details", key);
            return false;
        };

        if !self
            .capabilities
            .has_capability(CapabilityKind::PostNotification)
        {
            warn!("Dropping reminder {}: notification permission not granted", key);
            return false;
        }

        info!("Delivering reminder {}: {}", key, notification.body);
        self.notifier.notify(key, notification);
        true
    }
}

/// `Reminder: <name> on <date> at <time>`, or `None` if any field is absent.
pub fn render(payload: &ReminderPayload) -> Option<Notification> {
    let present = |field: &Option<String>| field.clone().filter(|v| !v.trim().is_empty());
    let name = present(&payload.name)?;
    let date = present(&payload.date)?;
    let time = present(&payload.time)?;

    Some(Notification {
        title: "Event reminder".to_string(),
        body: format!("Reminder: {} on {} at {}", name, date, time),
    })
}

/// Take every wake-up due at the clock's current instant off the schedule
/// and hand it to the deliverer. Returns the keys taken, delivered or not.
pub fn fire_due(
    timer: &TimerScheduler,
    clock: &dyn Clock,
    deliverer: &Deliverer,
) -> Vec<ReminderKey> {
    timer
        .take_due(clock.now())
        .into_iter()
        .map(|(key, wakeup)| {
            deliverer.deliver(key, &wakeup.payload);
            key
        })
        .collect()
}

/// One watch pass for `user_id`: sync the schedule with the store, fire
/// what is due, then mark those events' reminders as done. Returns how many
/// fired.
pub fn watch_pass(
    events: &EventService,
    user_id: UserId,
    timer: &TimerScheduler,
    clock: &dyn Clock,
    deliverer: &Deliverer,
) -> usize {
    if let Err(e) = events.sync_reminders(user_id) {
        warn!("Reminder sync failed, firing from the current schedule: {}", e);
    }

    let fired = fire_due(timer, clock, deliverer);
    for key in &fired {
        events.complete_reminder(*key, user_id);
    }
    fired.len()
}

/// Background task that keeps the schedule in step with the store and fires
/// due reminders.
///
/// Polls on an interval; delivery is at-most-once since due wake-ups are
/// removed before they are handed to the deliverer.
pub async fn run_delivery_loop(
    events: Arc<EventService>,
    user_id: UserId,
    timer: Arc<TimerScheduler>,
    clock: Arc<dyn Clock>,
    deliverer: Arc<Deliverer>,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        let fired = watch_pass(&events, user_id, &timer, clock.as_ref(), &deliverer);
        if fired > 0 {
            debug!("Delivery pass: {} reminder(s) fired", fired);
        }
    }
}
