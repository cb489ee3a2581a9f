//! Daemon configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default seconds between scheduled cycles.
const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default milliseconds between provider sends.
const DEFAULT_SEND_DELAY_MS: u64 = 2000;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `SQLite` database path.
    pub database_path: PathBuf,
    /// Root directory for attachment blobs.
    pub blob_root: PathBuf,
    /// Google `OAuth2` client id.
    pub client_id: String,
    /// Google `OAuth2` client secret.
    pub client_secret: String,
    /// Time between scheduled cycles.
    pub cycle_interval: Duration,
    /// Pause between provider sends.
    pub send_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `GMAIL_CLIENT_ID` and `GMAIL_CLIENT_SECRET` are required;
    /// everything else falls back to defaults under the platform data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailherald");

        let database_path = std::env::var_os("MAILHERALD_DB")
            .map_or_else(|| data_dir.join("mailherald.db"), PathBuf::from);
        let blob_root = std::env::var_os("MAILHERALD_BLOBS")
            .map_or_else(|| data_dir.join("blobs"), PathBuf::from);

        let client_id =
            std::env::var("GMAIL_CLIENT_ID").context("GMAIL_CLIENT_ID is not set")?;
        let client_secret =
            std::env::var("GMAIL_CLIENT_SECRET").context("GMAIL_CLIENT_SECRET is not set")?;

        let cycle_interval = duration_secs(
            std::env::var("MAILHERALD_INTERVAL_SECS").ok(),
            DEFAULT_INTERVAL_SECS,
        )
        .context("invalid MAILHERALD_INTERVAL_SECS")?;
        let send_delay = duration_millis(
            std::env::var("MAILHERALD_SEND_DELAY_MS").ok(),
            DEFAULT_SEND_DELAY_MS,
        )
        .context("invalid MAILHERALD_SEND_DELAY_MS")?;

        Ok(Self {
            database_path,
            blob_root,
            client_id,
            client_secret,
            cycle_interval,
            send_delay,
        })
    }
}

fn duration_secs(value: Option<String>, default: u64) -> Result<Duration> {
    let secs = match value {
        Some(raw) => raw.trim().parse::<u64>()?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

fn duration_millis(value: Option<String>, default: u64) -> Result<Duration> {
    let millis = match value {
        Some(raw) => raw.trim().parse::<u64>()?,
        None => default,
    };
    Ok(Duration::from_millis(millis))
}
