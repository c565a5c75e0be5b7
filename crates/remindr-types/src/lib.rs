//! Remindr shared types
//!
//! Domain model used by the store, the scheduler and the CLI. Kept free of
//! storage and platform dependencies so every crate can share it.

pub mod format;
pub mod models;
pub mod reminder;

pub use models::{Event, EventId, User, UserId};
pub use reminder::{CapabilityKind, ReminderKey, ReminderPayload};
