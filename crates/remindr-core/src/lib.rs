//! Remindr core
//!
//! Event validation, credential checks, reminder scheduling and delivery.
//! Storage lives in `remindr-db`; platform wake-ups and notifications are
//! reached through the traits in [`platform`] and [`delivery`].

pub mod clock;
pub mod credentials;
pub mod delivery;
pub mod error;
pub mod platform;
pub mod scheduler;
pub mod service;
pub mod validator;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthError, FlowError};
pub use service::{AccountService, EventService};
