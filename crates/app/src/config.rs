//! Application configuration

use std::path::PathBuf;

use clap::Args;
use jiff::SignedDuration;
use mala::rate_limit::RateLimitPolicy;
use rusty_money::iso::{self, Currency};
use thiserror::Error;

use crate::{checkout::DEFAULT_EVIDENCE_BUCKET, stores::SupabaseConfig};

/// Longest rate-limit window or block accepted, one year.
const MAX_RATE_LIMIT_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown currency code {0}")]
    UnknownCurrency(String),

    #[error("rate limit {setting} is too large: {value}")]
    RateLimitOutOfRange { setting: &'static str, value: u64 },
}

/// Everything the app needs to build its context.
#[derive(Debug, Args)]
pub struct AppConfig {
    /// Hosted backend settings.
    #[command(flatten)]
    pub store: StoreConfig,

    /// Device-local settings.
    #[command(flatten)]
    pub device: DeviceConfig,

    /// Submission rate limit settings.
    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

/// Hosted backend settings.
#[derive(Debug, Args)]
pub struct StoreConfig {
    /// Hosted backend project URL
    #[arg(long, env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    /// Hosted backend anonymous API key
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true, global = true)]
    pub supabase_anon_key: Option<String>,

    /// Bucket payment slips are uploaded to
    #[arg(long, env = "MALA_EVIDENCE_BUCKET", default_value = DEFAULT_EVIDENCE_BUCKET, global = true)]
    pub evidence_bucket: String,
}

impl StoreConfig {
    /// Backend connection details, if both the URL and key are set.
    #[must_use]
    pub fn supabase(&self) -> Option<SupabaseConfig> {
        Some(SupabaseConfig {
            url: self.supabase_url.clone()?,
            anon_key: self.supabase_anon_key.clone()?,
        })
    }
}

/// Device-local settings.
#[derive(Debug, Args)]
pub struct DeviceConfig {
    /// Directory device state is kept in
    #[arg(long, env = "MALA_DATA_DIR", default_value = ".mala", global = true)]
    pub data_dir: PathBuf,

    /// ISO 4217 code prices are expressed in
    #[arg(long, env = "MALA_CURRENCY", default_value = "THB", global = true)]
    pub currency: String,
}

impl DeviceConfig {
    /// Resolve the configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] for an unrecognised code.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        iso::find(&self.currency.to_uppercase())
            .ok_or_else(|| ConfigError::UnknownCurrency(self.currency.clone()))
    }
}

/// Submission rate limit settings.
#[derive(Debug, Args)]
pub struct RateLimitConfig {
    /// Submissions allowed inside one window
    #[arg(
        long,
        env = "MALA_RATE_LIMIT_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub rate_limit_attempts: u64,

    /// Window length in seconds
    #[arg(
        long,
        env = "MALA_RATE_LIMIT_WINDOW_SECS",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub rate_limit_window_secs: u64,

    /// Block length in minutes
    #[arg(
        long,
        env = "MALA_RATE_LIMIT_BLOCK_MINUTES",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub rate_limit_block_minutes: u64,
}

impl RateLimitConfig {
    /// The limiter policy these settings describe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RateLimitOutOfRange`] when a setting does not
    /// fit the limiter or a duration exceeds one year.
    pub fn policy(&self) -> Result<RateLimitPolicy, ConfigError> {
        let max_attempts =
            usize::try_from(self.rate_limit_attempts).map_err(|_| ConfigError::RateLimitOutOfRange {
                setting: "attempts",
                value: self.rate_limit_attempts,
            })?;

        Ok(RateLimitPolicy {
            max_attempts,
            window: bounded_duration("window", self.rate_limit_window_secs, 1)?,
            block_duration: bounded_duration("block", self.rate_limit_block_minutes, 60)?,
            ..RateLimitPolicy::default()
        })
    }
}

fn bounded_duration(
    setting: &'static str,
    value: u64,
    unit_secs: i64,
) -> Result<SignedDuration, ConfigError> {
    i64::try_from(value)
        .ok()
        .and_then(|value| value.checked_mul(unit_secs))
        .filter(|secs| *secs <= MAX_RATE_LIMIT_SECS)
        .map(SignedDuration::from_secs)
        .ok_or(ConfigError::RateLimitOutOfRange { setting, value })
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,
}
