use std::env;
use std::time::Duration;

use classroom_core::progress::ExerciseDuration;
use url::Url;

use crate::error::ConfigError;

pub const API_BASE_URL_ENV: &str = "CLASSROOM_API_BASE_URL";
pub const FAST_SECS_ENV: &str = "CLASSROOM_FAST_SECS";
pub const SLOW_SECS_ENV: &str = "CLASSROOM_SLOW_SECS";
pub const TICK_SECS_ENV: &str = "CLASSROOM_TICK_SECS";
pub const EXERCISE_MINUTES_ENV: &str = "CLASSROOM_EXERCISE_MINUTES";

//
// ─── API ──────────────────────────────────────────────────────────────────────
//

/// Backend location shared by the HTTP client and the push channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Builds a config from a raw base URL.
    ///
    /// Non-localhost `http:` URLs are upgraded to `https:` so a page served over
    /// TLS never talks to a plain-text backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Url` if the URL does not parse.
    pub fn new(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let upgraded = if !trimmed.contains("localhost") {
            match trimmed.strip_prefix("http:") {
                Some(rest) => format!("https:{rest}"),
                None => trimmed.to_string(),
            }
        } else {
            trimmed.to_string()
        };
        Ok(Self {
            base_url: Url::parse(&upgraded)?,
            request_timeout: Duration::from_secs(10),
        })
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when `CLASSROOM_API_BASE_URL` is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = env::var(API_BASE_URL_ENV).map_err(|_| ConfigError::Missing(API_BASE_URL_ENV))?;
        if raw.trim().is_empty() {
            return Err(ConfigError::Missing(API_BASE_URL_ENV));
        }
        Self::new(&raw)
    }
}

//
// ─── CADENCE ──────────────────────────────────────────────────────────────────
//

/// Periods of the three dashboard activities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CadenceConfig {
    /// Protected reconciliation.
    pub fast: Duration,
    /// Authoritative full resync.
    pub slow: Duration,
    /// Local progress ticker.
    pub tick: Duration,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(5),
            slow: Duration::from_secs(60),
            tick: Duration::from_secs(1),
        }
    }
}

impl CadenceConfig {
    /// Defaults overridden by `CLASSROOM_{FAST,SLOW,TICK}_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for values that are not positive integers.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            fast: secs_from_env(FAST_SECS_ENV)?.unwrap_or(defaults.fast),
            slow: secs_from_env(SLOW_SECS_ENV)?.unwrap_or(defaults.slow),
            tick: secs_from_env(TICK_SECS_ENV)?.unwrap_or(defaults.tick),
        })
    }
}

fn secs_from_env(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_positive(key, &raw).map(|secs| Some(Duration::from_secs(u64::from(secs)))),
        Err(_) => Ok(None),
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid {
            key,
            raw: raw.to_string(),
        }),
    }
}

//
// ─── EXERCISE ─────────────────────────────────────────────────────────────────
//

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExerciseConfig {
    pub duration: ExerciseDuration,
}

impl ExerciseConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `CLASSROOM_EXERCISE_MINUTES` is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let Ok(raw) = env::var(EXERCISE_MINUTES_ENV) else {
            return Ok(Self::default());
        };
        Self::from_minutes_str(EXERCISE_MINUTES_ENV, &raw)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` unless `raw` is a positive integer.
    pub fn from_minutes_str(key: &'static str, raw: &str) -> Result<Self, ConfigError> {
        let minutes = parse_positive(key, raw)?;
        let duration = ExerciseDuration::from_minutes(minutes).ok_or(ConfigError::Invalid {
            key,
            raw: raw.to_string(),
        })?;
        Ok(Self { duration })
    }
}
