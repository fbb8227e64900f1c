// Runtime configuration, read from environment variables (a `.env` file is
// loaded into the environment first by `main`).

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_SCAM_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_MAX_BUCKETS: usize = 10_000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Where automod rules are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    /// Rules are lost on restart. Handy for local testing.
    Memory,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub storage: StorageBackend,
    /// Folder for the SQLite database.
    pub data_dir: PathBuf,
    /// Link-reputation endpoint. `scam_links` conditions stay inert without it.
    pub scam_link_api_url: Option<String>,
    pub scam_link_timeout: Duration,
    pub max_buckets_per_limiter: usize,
    pub sweep_interval: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or_else(|| {
            anyhow!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")
        })?;

        let storage = match get("AUTOMOD_STORAGE").map(|v| v.trim().to_ascii_lowercase()) {
            None => StorageBackend::Sqlite,
            Some(v) if v == "sqlite" => StorageBackend::Sqlite,
            Some(v) if v == "memory" => StorageBackend::Memory,
            Some(other) => {
                return Err(anyhow!(
                    "Invalid value for AUTOMOD_STORAGE: {:?} (expected \"sqlite\" or \"memory\")",
                    other
                ))
            }
        };

        let data_dir = get("AUTOMOD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let scam_link_timeout = Duration::from_millis(parse_or(
            get("SCAM_LINK_TIMEOUT_MS"),
            "SCAM_LINK_TIMEOUT_MS",
            DEFAULT_SCAM_TIMEOUT_MS,
        )?);

        let max_buckets_per_limiter = parse_or(
            get("AUTOMOD_MAX_BUCKETS"),
            "AUTOMOD_MAX_BUCKETS",
            DEFAULT_MAX_BUCKETS,
        )?;

        let sweep_secs: u64 = parse_or(
            get("AUTOMOD_SWEEP_INTERVAL_SECS"),
            "AUTOMOD_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;
        if sweep_secs == 0 {
            return Err(anyhow!("AUTOMOD_SWEEP_INTERVAL_SECS must be at least 1"));
        }
        let sweep_interval = Duration::from_secs(sweep_secs);

        Ok(Self {
            discord_token,
            storage,
            data_dir,
            scam_link_api_url: get("SCAM_LINK_API_URL"),
            scam_link_timeout,
            max_buckets_per_limiter,
            sweep_interval,
        })
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.data_dir.join("automod.db").display())
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
