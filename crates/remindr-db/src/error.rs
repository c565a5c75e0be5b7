use thiserror::Error;

/// Failures surfaced by the credential and event stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("record already exists")]
    Duplicate,

    /// The storage engine failed (I/O, corruption, unexpected constraint)
    #[error("storage failure: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if is_unique_violation(&err) {
            StoreError::Duplicate
        } else {
            StoreError::Storage(err)
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
