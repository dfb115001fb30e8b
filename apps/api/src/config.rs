use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::rate_limit::UsageLimits;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub usage_limits: UsageLimits,
    /// Key namespace for the shared rate-limit counters in Redis.
    pub rate_limit_prefix: String,
    /// Longest a request may sleep waiting for a per-minute window to reopen.
    pub rate_limit_max_wait: Duration,
    pub file_poll_interval: Duration,
    pub file_poll_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            usage_limits: UsageLimits {
                requests_per_minute: env_or("GEMINI_RPM", 15)?,
                tokens_per_minute: env_or("GEMINI_TPM", 1_000_000)?,
                requests_per_day: env_or("GEMINI_RPD", 1_500)?,
            },
            rate_limit_prefix: std::env::var("RATE_LIMIT_PREFIX")
                .unwrap_or_else(|_| "origem".to_string()),
            rate_limit_max_wait: Duration::from_secs(env_or("RATE_LIMIT_MAX_WAIT_SECS", 60)?),
            file_poll_interval: Duration::from_millis(env_or("FILE_POLL_INTERVAL_MS", 2_000)?),
            file_poll_timeout: Duration::from_secs(env_or("FILE_POLL_TIMEOUT_SECS", 120)?),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, falling back to `default` when unset.
/// A value that is set but unparsable is an error rather than silently ignored.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
