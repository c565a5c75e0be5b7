use std::sync::Arc;

use tracing::{info, warn};

use remindr_types::{CapabilityKind, Event, ReminderKey};

use crate::platform::{
    CapabilityProvider, CapabilityResult, PendingWakeup, PlatformScheduler, SchedulerError,
};

/// State of one reminder attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderState {
    Idle,
    /// Waiting for the user to answer a prompt for this capability
    AwaitingPermission(CapabilityKind),
    PermissionGranted,
    /// Terminal: the event stays saved without a reminder
    PermissionDenied(CapabilityKind),
    Scheduled(ReminderKey),
    /// Terminal: the platform refused the wake-up
    SchedulingFailed(SchedulerError),
}

/// Final result of driving an attempt to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Scheduled(ReminderKey),
    PermissionDenied(CapabilityKind),
    Failed(SchedulerError),
}

/// One opt-in to a reminder, advanced by discrete capability results.
#[derive(Debug)]
pub struct ReminderAttempt {
    state: ReminderState,
    granted: Vec<CapabilityKind>,
}

impl Default for ReminderAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl ReminderAttempt {
    pub fn new() -> Self {
        Self {
            state: ReminderState::Idle,
            granted: Vec::new(),
        }
    }

    pub fn state(&self) -> &ReminderState {
        &self.state
    }

    /// `Idle -> AwaitingPermission`, falling through to `PermissionGranted`
    /// when every required capability is already held.
    pub fn opt_in(&mut self, capabilities: &dyn CapabilityProvider) -> &ReminderState {
        if self.state == ReminderState::Idle {
            self.state = self.next_missing(capabilities);
        }
        &self.state
    }

    /// Feed the user's (or platform's) answer for `kind`. Answers for a
    /// capability that is not being awaited are ignored.
    pub fn on_capability_result(
        &mut self,
        kind: CapabilityKind,
        result: CapabilityResult,
        capabilities: &dyn CapabilityProvider,
    ) -> &ReminderState {
        match self.state {
            ReminderState::AwaitingPermission(awaited) if awaited == kind => {
                self.state = match result {
                    CapabilityResult::Granted => {
                        self.granted.push(kind);
                        self.next_missing(capabilities)
                    }
                    CapabilityResult::Denied => ReminderState::PermissionDenied(kind),
                };
            }
            _ => warn!("Ignoring {:?} for {} in state {:?}", result, kind, self.state),
        }
        &self.state
    }

    /// `PermissionGranted -> Scheduled | SchedulingFailed`.
    pub fn schedule(&mut self, event: &Event, platform: &dyn PlatformScheduler) -> &ReminderState {
        if self.state != ReminderState::PermissionGranted {
            warn!("Cannot schedule event {} from state {:?}", event.id, self.state);
            return &self.state;
        }

        let key = event.reminder_key();
        self.state = match platform.schedule_once(key, event.occurs_at, event.reminder_payload()) {
            Ok(()) => ReminderState::Scheduled(key),
            Err(e) => ReminderState::SchedulingFailed(e),
        };
        &self.state
    }

    /// First required capability neither held nor granted during this attempt.
    fn next_missing(&self, capabilities: &dyn CapabilityProvider) -> ReminderState {
        CapabilityKind::REQUIRED
            .into_iter()
            .filter(|kind| !self.granted.contains(kind))
            .find(|kind| !capabilities.has_capability(*kind))
            .map(ReminderState::AwaitingPermission)
            .unwrap_or(ReminderState::PermissionGranted)
    }

    fn outcome(&self) -> Option<ReminderOutcome> {
        match &self.state {
            ReminderState::Scheduled(key) => Some(ReminderOutcome::Scheduled(*key)),
            ReminderState::PermissionDenied(kind) => Some(ReminderOutcome::PermissionDenied(*kind)),
            ReminderState::SchedulingFailed(e) => Some(ReminderOutcome::Failed(e.clone())),
            _ => None,
        }
    }
}

/// Schedules and cancels event reminders against the platform.
#[derive(Clone)]
pub struct ReminderScheduler {
    platform: Arc<dyn PlatformScheduler>,
    capabilities: Arc<dyn CapabilityProvider>,
}

impl ReminderScheduler {
    pub fn new(
        platform: Arc<dyn PlatformScheduler>,
        capabilities: Arc<dyn CapabilityProvider>,
    ) -> Self {
        Self {
            platform,
            capabilities,
        }
    }

    /// Run a full attempt for `event`, prompting for each missing capability.
    pub fn request(&self, event: &Event) -> ReminderOutcome {
        let mut attempt = ReminderAttempt::new();
        attempt.opt_in(self.capabilities.as_ref());

        while let ReminderState::AwaitingPermission(kind) = *attempt.state() {
            let result = self.capabilities.request_capability(kind);
            attempt.on_capability_result(kind, result, self.capabilities.as_ref());
        }

        if *attempt.state() == ReminderState::PermissionGranted {
            attempt.schedule(event, self.platform.as_ref());
        }
        let outcome = attempt
            .outcome()
            .unwrap_or(ReminderOutcome::Failed(SchedulerError::CapabilityRevoked));

        match &outcome {
            ReminderOutcome::Scheduled(key) => {
                info!("Reminder {} scheduled for {}", key, event.occurs_at)
            }
            ReminderOutcome::PermissionDenied(kind) => {
                info!("Reminder for event {} skipped: cannot {}", event.id, kind)
            }
            ReminderOutcome::Failed(e) => warn!("Reminder for event {} failed: {}", event.id, e),
        }
        outcome
    }

    /// Re-register a wake-up without prompting. Used when restoring armed
    /// reminders; skipped unless every capability is already held.
    pub fn restore(&self, event: &Event) -> Option<ReminderOutcome> {
        let mut attempt = ReminderAttempt::new();
        if *attempt.opt_in(self.capabilities.as_ref()) != ReminderState::PermissionGranted {
            return None;
        }
        attempt.schedule(event, self.platform.as_ref());
        attempt.outcome()
    }

    /// Revoke the wake-up for `event`. No-op when nothing is pending.
    pub fn cancel(&self, event: &Event) -> bool {
        self.cancel_key(event.reminder_key())
    }

    pub fn cancel_key(&self, key: ReminderKey) -> bool {
        self.platform.cancel(key)
    }

    pub fn is_pending(&self, key: ReminderKey) -> bool {
        self.platform.is_pending(key)
    }

    pub fn pending(&self, key: ReminderKey) -> Option<PendingWakeup> {
        self.platform.pending(key)
    }

    pub fn pending_keys(&self) -> Vec<ReminderKey> {
        self.platform.pending_keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::platform::{CapabilityPolicy, ConfiguredCapabilities, TimerScheduler};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn event(id: i64, name: &str) -> Event {
        Event {
            id,
            user_id: 1,
            name: name.into(),
            occurs_at: now() + Duration::hours(2),
            reminder_requested: false,
        }
    }

    fn setup(
        notifications: CapabilityPolicy,
        exact: CapabilityPolicy,
    ) -> (ReminderScheduler, Arc<ConfiguredCapabilities>) {
        let caps = Arc::new(ConfiguredCapabilities::new(notifications, exact));
        let timer = Arc::new(TimerScheduler::new(
            Arc::new(FixedClock::new(now())),
            caps.clone(),
        ));
        (ReminderScheduler::new(timer, caps.clone()), caps)
    }

    #[test]
    fn opt_in_with_all_capabilities_is_granted() {
        let caps = ConfiguredCapabilities::all_granted();
        let mut attempt = ReminderAttempt::new();
        assert_eq!(attempt.opt_in(&caps), &ReminderState::PermissionGranted);
    }

    #[test]
    fn capabilities_are_requested_one_at_a_time() {
        let caps = ConfiguredCapabilities::new(
            CapabilityPolicy::GrantOnRequest,
            CapabilityPolicy::GrantOnRequest,
        );
        let mut attempt = ReminderAttempt::new();

        assert_eq!(
            attempt.opt_in(&caps),
            &ReminderState::AwaitingPermission(CapabilityKind::PostNotification)
        );
        assert_eq!(
            attempt.on_capability_result(
                CapabilityKind::PostNotification,
                CapabilityResult::Granted,
                &caps
            ),
            &ReminderState::AwaitingPermission(CapabilityKind::ScheduleExactReminder)
        );
        assert_eq!(
            attempt.on_capability_result(
                CapabilityKind::ScheduleExactReminder,
                CapabilityResult::Granted,
                &caps
            ),
            &ReminderState::PermissionGranted
        );
    }

    #[test]
    fn denial_is_terminal() {
        let caps = ConfiguredCapabilities::new(CapabilityPolicy::Denied, CapabilityPolicy::Granted);
        let mut attempt = ReminderAttempt::new();
        attempt.opt_in(&caps);
        attempt.on_capability_result(
            CapabilityKind::PostNotification,
            CapabilityResult::Denied,
            &caps,
        );
        assert_eq!(
            attempt.state(),
            &ReminderState::PermissionDenied(CapabilityKind::PostNotification)
        );

        // late answers do not revive the attempt
        attempt.on_capability_result(
            CapabilityKind::PostNotification,
            CapabilityResult::Granted,
            &caps,
        );
        assert_eq!(
            attempt.state(),
            &ReminderState::PermissionDenied(CapabilityKind::PostNotification)
        );
    }

    #[test]
    fn schedule_before_grant_is_ignored() {
        let (scheduler, _) = setup(CapabilityPolicy::Granted, CapabilityPolicy::Granted);
        let mut attempt = ReminderAttempt::new();
        let e = event(1, "Standup");
        assert_eq!(
            attempt.schedule(&e, scheduler.platform.as_ref()),
            &ReminderState::Idle
        );
        assert!(!scheduler.is_pending(e.reminder_key()));
    }

    #[test]
    fn request_schedules_with_event_key() {
        let (scheduler, _) = setup(CapabilityPolicy::GrantOnRequest, CapabilityPolicy::Granted);
        let e = event(4, "Standup");
        assert_eq!(
            scheduler.request(&e),
            ReminderOutcome::Scheduled(ReminderKey::for_event(4))
        );
        assert!(scheduler.is_pending(ReminderKey::for_event(4)));
    }

    #[test]
    fn request_denied_schedules_nothing() {
        let (scheduler, _) = setup(CapabilityPolicy::Granted, CapabilityPolicy::Denied);
        let e = event(4, "Standup");
        assert_eq!(
            scheduler.request(&e),
            ReminderOutcome::PermissionDenied(CapabilityKind::ScheduleExactReminder)
        );
        assert!(!scheduler.is_pending(e.reminder_key()));
    }

    #[test]
    fn past_event_reports_scheduling_failure() {
        let (scheduler, _) = setup(CapabilityPolicy::Granted, CapabilityPolicy::Granted);
        let mut e = event(4, "Standup");
        e.occurs_at = now() - Duration::minutes(5);
        assert_eq!(
            scheduler.request(&e),
            ReminderOutcome::Failed(SchedulerError::TriggerInPast)
        );
    }

    #[test]
    fn cancel_after_rename_finds_original_wakeup() {
        let (scheduler, _) = setup(CapabilityPolicy::Granted, CapabilityPolicy::Granted);
        let mut e = event(6, "Standup");
        scheduler.request(&e);

        e.name = "Daily sync".into();
        assert!(scheduler.cancel(&e));
        assert!(!scheduler.cancel(&e));
    }

    #[test]
    fn restore_never_prompts() {
        let (scheduler, caps) =
            setup(CapabilityPolicy::GrantOnRequest, CapabilityPolicy::Granted);
        let e = event(2, "Standup");
        assert_eq!(scheduler.restore(&e), None);
        assert!(!caps.has_capability(CapabilityKind::PostNotification));

        caps.set(CapabilityKind::PostNotification, CapabilityPolicy::Granted);
        assert_eq!(
            scheduler.restore(&e),
            Some(ReminderOutcome::Scheduled(e.reminder_key()))
        );
    }
}
