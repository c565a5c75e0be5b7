use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use remindr_core::platform::CapabilityPolicy;

pub struct Config {
    pub db_path: PathBuf,
    pub session_file: PathBuf,
    pub poll_secs: u64,
    pub notifications: CapabilityPolicy,
    pub exact_reminders: CapabilityPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("REMINDR_DB_PATH").unwrap_or_else(|_| "remindr.db".into());
        let session_file =
            std::env::var("REMINDR_SESSION_FILE").unwrap_or_else(|_| ".remindr-session".into());
        let poll_secs: u64 = std::env::var("REMINDR_POLL_SECS")
            .unwrap_or_else(|_| "1".into())
            .parse()
            .context("REMINDR_POLL_SECS must be a whole number of seconds")?;

        Ok(Self {
            db_path: db_path.into(),
            session_file: session_file.into(),
            poll_secs,
            notifications: policy_from_env("REMINDR_GRANT_NOTIFICATIONS")?,
            exact_reminders: policy_from_env("REMINDR_GRANT_EXACT_ALARMS")?,
        })
    }
}

fn policy_from_env(key: &str) -> Result<CapabilityPolicy> {
    match std::env::var(key) {
        Ok(value) => parse_policy(&value).with_context(|| format!("invalid {key}")),
        Err(_) => Ok(CapabilityPolicy::Granted),
    }
}

/// `true`/`granted`, `prompt`, or `false`/`denied`.
fn parse_policy(value: &str) -> Result<CapabilityPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "granted" | "1" => Ok(CapabilityPolicy::Granted),
        "prompt" => Ok(CapabilityPolicy::GrantOnRequest),
        "false" | "denied" | "0" => Ok(CapabilityPolicy::Denied),
        other => bail!("expected granted, prompt or denied, got {other:?}"),
    }
}
