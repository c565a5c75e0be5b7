//! Platform collaborators: permission checks and one-shot wake-ups.
//!
//! The core talks to the device only through [`CapabilityProvider`] and
//! [`PlatformScheduler`]. [`ConfiguredCapabilities`] and [`TimerScheduler`]
//! are the in-process implementations used by the CLI and the tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, warn};

use remindr_types::{CapabilityKind, ReminderKey, ReminderPayload};

use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityResult {
    Granted,
    Denied,
}

pub trait CapabilityProvider: Send + Sync {
    fn has_capability(&self, kind: CapabilityKind) -> bool;

    /// Prompt for `kind`. Implementations backed by a real prompt answer
    /// once the user responds.
    fn request_capability(&self, kind: CapabilityKind) -> CapabilityResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Exact reminders are not allowed on this device")]
    CapabilityRevoked,

    #[error("The reminder time has already passed")]
    TriggerInPast,
}

pub trait PlatformScheduler: Send + Sync {
    /// Register a wake-up for `key`, replacing any pending one.
    fn schedule_once(
        &self,
        key: ReminderKey,
        trigger_at: NaiveDateTime,
        payload: ReminderPayload,
    ) -> Result<(), SchedulerError>;

    /// Revoke the pending wake-up for `key`. Returns whether one existed.
    fn cancel(&self, key: ReminderKey) -> bool;

    fn pending(&self, key: ReminderKey) -> Option<PendingWakeup>;

    fn pending_keys(&self) -> Vec<ReminderKey>;

    fn is_pending(&self, key: ReminderKey) -> bool {
        self.pending(key).is_some()
    }
}

/// How a capability answers checks and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityPolicy {
    /// Already held
    Granted,
    /// Not held; granted when requested
    GrantOnRequest,
    /// Not held; requests are declined
    Denied,
}

/// Capability answers fixed by configuration.
pub struct ConfiguredCapabilities {
    policies: Mutex<HashMap<CapabilityKind, CapabilityPolicy>>,
}

impl ConfiguredCapabilities {
    pub fn new(notifications: CapabilityPolicy, exact_reminders: CapabilityPolicy) -> Self {
        let policies = HashMap::from([
            (CapabilityKind::PostNotification, notifications),
            (CapabilityKind::ScheduleExactReminder, exact_reminders),
        ]);
        Self {
            policies: Mutex::new(policies),
        }
    }

    pub fn all_granted() -> Self {
        Self::new(CapabilityPolicy::Granted, CapabilityPolicy::Granted)
    }

    pub fn set(&self, kind: CapabilityKind, policy: CapabilityPolicy) {
        self.lock().insert(kind, policy);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CapabilityKind, CapabilityPolicy>> {
        self.policies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CapabilityProvider for ConfiguredCapabilities {
    fn has_capability(&self, kind: CapabilityKind) -> bool {
        self.lock().get(&kind) == Some(&CapabilityPolicy::Granted)
    }

    fn request_capability(&self, kind: CapabilityKind) -> CapabilityResult {
        let mut policies = self.lock();
        match policies.get(&kind).copied() {
            Some(CapabilityPolicy::Granted) => CapabilityResult::Granted,
            Some(CapabilityPolicy::GrantOnRequest) => {
                policies.insert(kind, CapabilityPolicy::Granted);
                CapabilityResult::Granted
            }
            Some(CapabilityPolicy::Denied) | None => CapabilityResult::Denied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWakeup {
    pub trigger_at: NaiveDateTime,
    pub payload: ReminderPayload,
}

/// In-process one-shot scheduler.
///
/// Wake-ups live in memory only. The delivery loop drains due entries with
/// [`TimerScheduler::take_due`], so each fires at most once.
pub struct TimerScheduler {
    pending: Mutex<HashMap<ReminderKey, PendingWakeup>>,
    clock: Arc<dyn Clock>,
    capabilities: Arc<dyn CapabilityProvider>,
}

impl TimerScheduler {
    pub fn new(clock: Arc<dyn Clock>, capabilities: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            clock,
            capabilities,
        }
    }

    /// Remove and return every wake-up due at or before `now`, earliest first.
    pub fn take_due(&self, now: NaiveDateTime) -> Vec<(ReminderKey, PendingWakeup)> {
        let mut pending = self.lock();
        let due_keys: Vec<ReminderKey> = pending
            .iter()
            .filter(|(_, w)| w.trigger_at <= now)
            .map(|(k, _)| *k)
            .collect();

        let mut due: Vec<_> = due_keys
            .into_iter()
            .filter_map(|k| pending.remove(&k).map(|w| (k, w)))
            .collect();
        due.sort_by_key(|(k, w)| (w.trigger_at, *k));
        due
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ReminderKey, PendingWakeup>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PlatformScheduler for TimerScheduler {
    fn schedule_once(
        &self,
        key: ReminderKey,
        trigger_at: NaiveDateTime,
        payload: ReminderPayload,
    ) -> Result<(), SchedulerError> {
        if !self
            .capabilities
            .has_capability(CapabilityKind::ScheduleExactReminder)
        {
            warn!("Refusing wake-up {}: exact scheduling not permitted", key);
            return Err(SchedulerError::CapabilityRevoked);
        }
        if trigger_at < self.clock.now() {
            warn!("Refusing wake-up {}: trigger {} already passed", key, trigger_at);
            return Err(SchedulerError::TriggerInPast);
        }

        debug!("Wake-up {} registered for {}", key, trigger_at);
        self.lock().insert(key, PendingWakeup { trigger_at, payload });
        Ok(())
    }

    fn cancel(&self, key: ReminderKey) -> bool {
        let removed = self.lock().remove(&key).is_some();
        debug!("Cancel wake-up {}: {}", key, if removed { "revoked" } else { "none pending" });
        removed
    }

    fn pending(&self, key: ReminderKey) -> Option<PendingWakeup> {
        self.lock().get(&key).cloned()
    }

    fn pending_keys(&self) -> Vec<ReminderKey> {
        let mut keys: Vec<_> = self.lock().keys().copied().collect();
        keys.sort();
        keys
    }
}
