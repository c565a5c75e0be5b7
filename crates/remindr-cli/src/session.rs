use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use remindr_types::{User, UserId};

/// Logged-in user, remembered between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub username: String,
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
        }
    }
}

pub fn load(path: &Path) -> Result<Option<Session>> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let session = serde_json::from_str(&raw)
                .with_context(|| format!("corrupt session file {}", path.display()))?;
            Ok(Some(session))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

pub fn save(path: &Path, session: &Session) -> Result<()> {
    fs::write(path, serde_json::to_string(session)?)
        .with_context(|| format!("writing {}", path.display()))
}

/// Returns whether a session existed.
pub fn clear(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}
