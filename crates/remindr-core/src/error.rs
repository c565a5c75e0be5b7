use thiserror::Error;

use remindr_db::StoreError;

use crate::validator::ValidationError;

/// Registration and login failures. Display text is shown to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please enter a {0}")]
    FieldRequired(&'static str),

    #[error("That username is already taken")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Could not secure the password: {0}")]
    Hash(String),

    #[error("Account storage is unavailable. Please try again.")]
    Storage(#[source] StoreError),
}

/// Outcome of an event flow that did not complete. Display text is shown to
/// the user; the source chain is for logs.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("An event with this name, date and time already exists")]
    Duplicate,

    #[error("Event not found")]
    NotFound,

    #[error("Could not save the event. Please try again.")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for FlowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => FlowError::Duplicate,
            other => FlowError::Storage(other),
        }
    }
}
