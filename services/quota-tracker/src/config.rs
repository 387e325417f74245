use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Limit applied when `DAILY_CHAT_LIMIT` is absent, malformed, or non-positive.
pub const DEFAULT_DAILY_LIMIT: u64 = 20;

/// Upper bound for the configured limit. Larger values are clamped, so a
/// misconfigured environment cannot disable quota enforcement.
pub const MAX_DAILY_LIMIT: u64 = 1000;

#[derive(Debug, Clone)]
pub struct QuotaTrackerConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub daily_limit: u64,
}

impl Default for QuotaTrackerConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8183,
            data_dir: PathBuf::from("data/quota"),
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }
}

impl QuotaTrackerConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("QUOTA_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("QUOTA_PORT") {
            cfg.server_port = port.parse().context("QUOTA_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("QUOTA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        cfg.daily_limit = normalize_daily_limit(env::var("DAILY_CHAT_LIMIT").ok().as_deref());

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if self.daily_limit == 0 {
            anyhow::bail!("daily limit must be greater than zero");
        }
        if self.daily_limit > MAX_DAILY_LIMIT {
            anyhow::bail!("daily limit must not exceed {MAX_DAILY_LIMIT}");
        }

        Ok(())
    }
}

/// Maps a raw `DAILY_CHAT_LIMIT` value into the enforceable range.
///
/// Absent, non-numeric, and non-positive values all fall back to
/// [`DEFAULT_DAILY_LIMIT`]; values above [`MAX_DAILY_LIMIT`] are clamped.
/// Corrections are logged so a bad deployment config is visible at startup.
pub fn normalize_daily_limit(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_DAILY_LIMIT;
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if value <= 0 => {
            warn!(value, "DAILY_CHAT_LIMIT must be positive, using default");
            DEFAULT_DAILY_LIMIT
        }
        Ok(value) if value as u64 > MAX_DAILY_LIMIT => {
            warn!(
                value,
                max = MAX_DAILY_LIMIT,
                "DAILY_CHAT_LIMIT above maximum, clamping"
            );
            MAX_DAILY_LIMIT
        }
        Ok(value) => value as u64,
        Err(_) => {
            warn!(raw, "DAILY_CHAT_LIMIT is not an integer, using default");
            DEFAULT_DAILY_LIMIT
        }
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}
