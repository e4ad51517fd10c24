use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::hooks::REACTION_RETRACT_DELAY;

pub const DEFAULT_REDACTED_MESSAGE: &str = "(message deleted)";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Body every redacted post is left with.
    pub redacted_message: String,
    /// `None` disables the edit time limit.
    pub post_edit_time_limit: Option<Duration>,
    pub reaction_retract_delay: Duration,
    /// Usernames registered as system admins.
    pub system_admins: Vec<String>,
}

impl Config {
    /// Read `TOMBSTONE_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port: u16 = get("TOMBSTONE_PORT", "3000")
            .parse()
            .context("TOMBSTONE_PORT must be a port number")?;

        let redacted_message = get("TOMBSTONE_REDACTED_MESSAGE", DEFAULT_REDACTED_MESSAGE);
        if redacted_message.trim().is_empty() {
            bail!("TOMBSTONE_REDACTED_MESSAGE must not be empty");
        }

        let limit_secs: i64 = get("TOMBSTONE_POST_EDIT_TIME_LIMIT", "-1")
            .parse()
            .context("TOMBSTONE_POST_EDIT_TIME_LIMIT must be a number of seconds")?;
        let post_edit_time_limit = (limit_secs > 0).then(|| Duration::from_secs(limit_secs as u64));

        let reaction_retract_delay = match lookup("TOMBSTONE_REACTION_RETRACT_DELAY_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .context("TOMBSTONE_REACTION_RETRACT_DELAY_MS must be a number of milliseconds")?,
            ),
            None => REACTION_RETRACT_DELAY,
        };

        let system_admins = get("TOMBSTONE_SYSTEM_ADMINS", "")
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            host: get("TOMBSTONE_HOST", "0.0.0.0"),
            port,
            db_path: get("TOMBSTONE_DB_PATH", "tombstone.db").into(),
            redacted_message,
            post_edit_time_limit,
            reaction_retract_delay,
            system_admins,
        })
    }
}
