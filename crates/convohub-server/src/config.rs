use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

const PLACEHOLDER_SECRET: &str = "dev-secret-change-me";

// Access tokens live at most a week.
const ACCESS_MINUTES: RangeInclusive<i64> = 1..=10_080;
const REFRESH_DAYS: RangeInclusive<i64> = 1..=365;
const CHAT_BUFFER: RangeInclusive<usize> = 1..=65_536;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub chat_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: string("CONVOHUB_HOST", "0.0.0.0"),
            port: parsed(&lookup, "CONVOHUB_PORT", 8000)?,
            db_path: PathBuf::from(string("CONVOHUB_DB_PATH", "convohub.db")),
            media_dir: PathBuf::from(string("CONVOHUB_MEDIA_DIR", "media")),
            jwt_secret: string("CONVOHUB_JWT_SECRET", PLACEHOLDER_SECRET),
            access_token_minutes: bounded(&lookup, "CONVOHUB_ACCESS_TOKEN_MINUTES", 60, ACCESS_MINUTES)?,
            refresh_token_days: bounded(&lookup, "CONVOHUB_REFRESH_TOKEN_DAYS", 1, REFRESH_DAYS)?,
            chat_buffer: bounded(&lookup, "CONVOHUB_CHAT_BUFFER", 64, CHAT_BUFFER)?,
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret == PLACEHOLDER_SECRET || self.jwt_secret.is_empty()
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number, got {raw:?}")),
        None => Ok(default),
    }
}

fn bounded<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T>
where
    T: FromStr + PartialOrd + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parsed(lookup, key, default)?;
    if !range.contains(&value) {
        bail!(
            "{key} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}
