//! Strongly-typed configuration for the publish workflow core.
//!
//! Configuration values can be constructed from defaults, loaded from
//! environment variables (with optional `.env` support), or merged with
//! explicit overrides for programmatic updates. All retry budgets and pacing
//! knobs used by the orchestrator live here so embedding services can tune
//! them without touching workflow code.

use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shared logger callback signature used by the configuration.
pub type LoggerCallback = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// Verbosity level for workflow logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Minimal,
    Medium,
    Detailed,
}

impl Verbosity {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Medium
    }
}

/// Configuration values for the publish workflow core.
#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CrosspostConfig {
    pub verbose: Verbosity,
    pub headless: bool,
    /// Overall budget for one publish/verify/track session, in milliseconds.
    #[serde(alias = "sessionTimeoutMs")]
    pub session_timeout_ms: u64,
    /// Default per-stage retry budget.
    #[serde(alias = "stageTimeoutMs")]
    pub stage_timeout_ms: u64,
    #[serde(alias = "stageIntervalMs")]
    pub stage_interval_ms: u64,
    #[serde(alias = "stageMaxRetries")]
    pub stage_max_retries: u32,
    /// Bounded window for the post-injection login heuristic.
    #[serde(alias = "loginProbeTimeoutMs")]
    pub login_probe_timeout_ms: u64,
    /// Bounded window for publish confirmation polling.
    #[serde(alias = "confirmTimeoutMs")]
    pub confirm_timeout_ms: u64,
    /// Fixed human-like delay between simulated interactions.
    #[serde(alias = "pacingMs")]
    pub pacing_ms: u64,
    #[serde(alias = "screenshotOnFailure")]
    pub screenshot_on_failure: bool,
    #[serde(skip_serializing, skip_deserializing)]
    pub logger: Option<LoggerCallback>,
}

impl Default for CrosspostConfig {
    fn default() -> Self {
        CrosspostConfig {
            verbose: Verbosity::default(),
            headless: true,
            session_timeout_ms: 180_000,
            stage_timeout_ms: 15_000,
            stage_interval_ms: 1_000,
            stage_max_retries: 10,
            login_probe_timeout_ms: 8_000,
            confirm_timeout_ms: 20_000,
            pacing_ms: 750,
            screenshot_on_failure: true,
            logger: None,
        }
    }
}

impl CrosspostConfig {
    /// Construct a configuration by reading relevant environment variables,
    /// after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        let mut config = CrosspostConfig::default();

        if let Some(value) = env_var("CROSSPOST_VERBOSE") {
            let parsed = parse_u8("CROSSPOST_VERBOSE", &value)?;
            config.verbose = Verbosity::from_u8(parsed).ok_or_else(|| {
                ConfigError::invalid_enum("CROSSPOST_VERBOSE", parsed.to_string())
            })?;
        }

        if let Some(value) = env_var("CROSSPOST_HEADLESS") {
            config.headless = parse_bool("CROSSPOST_HEADLESS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_SESSION_TIMEOUT_MS") {
            config.session_timeout_ms = parse_u64("CROSSPOST_SESSION_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_STAGE_TIMEOUT_MS") {
            config.stage_timeout_ms = parse_u64("CROSSPOST_STAGE_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_STAGE_INTERVAL_MS") {
            config.stage_interval_ms = parse_u64("CROSSPOST_STAGE_INTERVAL_MS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_STAGE_MAX_RETRIES") {
            config.stage_max_retries =
                parse_u64("CROSSPOST_STAGE_MAX_RETRIES", &value)? as u32;
        }

        if let Some(value) = env_var("CROSSPOST_LOGIN_PROBE_TIMEOUT_MS") {
            config.login_probe_timeout_ms =
                parse_u64("CROSSPOST_LOGIN_PROBE_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_CONFIRM_TIMEOUT_MS") {
            config.confirm_timeout_ms = parse_u64("CROSSPOST_CONFIRM_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_PACING_MS") {
            config.pacing_ms = parse_u64("CROSSPOST_PACING_MS", &value)?;
        }

        if let Some(value) = env_var("CROSSPOST_SCREENSHOT_ON_FAILURE") {
            config.screenshot_on_failure =
                parse_bool("CROSSPOST_SCREENSHOT_ON_FAILURE", &value)?;
        }

        Ok(config)
    }

    /// Create a new configuration with explicit field overrides applied.
    pub fn with_overrides(&self, overrides: CrosspostConfigOverrides) -> CrosspostConfig {
        let mut next = self.clone();

        if let Some(value) = overrides.verbose {
            next.verbose = value;
        }
        if let Some(value) = overrides.headless {
            next.headless = value;
        }
        if let Some(value) = overrides.session_timeout_ms {
            next.session_timeout_ms = value;
        }
        if let Some(value) = overrides.stage_timeout_ms {
            next.stage_timeout_ms = value;
        }
        if let Some(value) = overrides.stage_interval_ms {
            next.stage_interval_ms = value;
        }
        if let Some(value) = overrides.stage_max_retries {
            next.stage_max_retries = value;
        }
        if let Some(value) = overrides.login_probe_timeout_ms {
            next.login_probe_timeout_ms = value;
        }
        if let Some(value) = overrides.confirm_timeout_ms {
            next.confirm_timeout_ms = value;
        }
        if let Some(value) = overrides.pacing_ms {
            next.pacing_ms = value;
        }
        if let Some(value) = overrides.screenshot_on_failure {
            next.screenshot_on_failure = value;
        }
        if let Some(value) = overrides.logger {
            next.logger = value;
        }

        next
    }
}

/// Field-level overrides for [`CrosspostConfig::with_overrides`].
#[derive(Default, Clone)]
pub struct CrosspostConfigOverrides {
    pub verbose: Option<Verbosity>,
    pub headless: Option<bool>,
    pub session_timeout_ms: Option<u64>,
    pub stage_timeout_ms: Option<u64>,
    pub stage_interval_ms: Option<u64>,
    pub stage_max_retries: Option<u32>,
    pub login_probe_timeout_ms: Option<u64>,
    pub confirm_timeout_ms: Option<u64>,
    pub pacing_ms: Option<u64>,
    pub screenshot_on_failure: Option<bool>,
    pub logger: Option<Option<LoggerCallback>>,
}

impl fmt::Debug for CrosspostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrosspostConfig")
            .field("verbose", &self.verbose)
            .field("headless", &self.headless)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .field("stage_timeout_ms", &self.stage_timeout_ms)
            .field("stage_interval_ms", &self.stage_interval_ms)
            .field("stage_max_retries", &self.stage_max_retries)
            .field("login_probe_timeout_ms", &self.login_probe_timeout_ms)
            .field("confirm_timeout_ms", &self.confirm_timeout_ms)
            .field("pacing_ms", &self.pacing_ms)
            .field("screenshot_on_failure", &self.screenshot_on_failure)
            .field("logger_present", &self.logger.is_some())
            .finish()
    }
}

/// Errors that can arise while constructing a [`CrosspostConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {field}")]
    InvalidEnumVariant { field: &'static str, value: String },
    #[error("invalid boolean '{value}' for {field}")]
    InvalidBool { field: &'static str, value: String },
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl ConfigError {
    fn invalid_enum(field: &'static str, value: String) -> Self {
        ConfigError::InvalidEnumVariant { field, value }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_u8(field: &'static str, value: &str) -> Result<u8, ConfigError> {
    value
        .trim()
        .parse::<u8>()
        .map_err(|source| ConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| ConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[derive(Debug)]
    struct EnvGuard {
        saved: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[(&str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let original = env::var(key).ok();
                    match value {
                        Some(v) => env::set_var(key, v),
                        None => env::remove_var(key),
                    };
                    ((*key).to_string(), original)
                })
                .collect();
            EnvGuard { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.saved.drain(..) {
                match value {
                    Some(v) => env::set_var(&key, v),
                    None => env::remove_var(&key),
                }
            }
        }
    }

    fn with_env<F, T>(vars: &[(&str, Option<&str>)], f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let lock = env_lock().lock().expect("env mutex poisoned");
        let guard = EnvGuard::new(vars);
        let result = f();
        drop(guard);
        drop(lock);
        result
    }

    #[test]
    fn defaults_are_sensible() {
        let config = CrosspostConfig::default();
        assert_eq!(config.verbose, Verbosity::Medium);
        assert!(config.headless);
        assert_eq!(config.session_timeout_ms, 180_000);
        assert_eq!(config.stage_timeout_ms, 15_000);
        assert_eq!(config.stage_interval_ms, 1_000);
        assert_eq!(config.stage_max_retries, 10);
        assert!(config.screenshot_on_failure);
    }

    #[test]
    fn from_env_parses_and_normalises_values() {
        let vars = [
            ("CROSSPOST_VERBOSE", Some("2")),
            ("CROSSPOST_HEADLESS", Some("false")),
            ("CROSSPOST_SESSION_TIMEOUT_MS", Some("60000")),
            ("CROSSPOST_STAGE_TIMEOUT_MS", Some("5000")),
            ("CROSSPOST_STAGE_INTERVAL_MS", Some("250")),
            ("CROSSPOST_STAGE_MAX_RETRIES", Some("4")),
            ("CROSSPOST_LOGIN_PROBE_TIMEOUT_MS", Some("3000")),
            ("CROSSPOST_CONFIRM_TIMEOUT_MS", Some("9000")),
            ("CROSSPOST_PACING_MS", Some("100")),
            ("CROSSPOST_SCREENSHOT_ON_FAILURE", Some("no")),
        ];

        with_env(&vars, || {
            let config = CrosspostConfig::from_env().expect("config from env");
            assert_eq!(config.verbose, Verbosity::Detailed);
            assert!(!config.headless);
            assert_eq!(config.session_timeout_ms, 60_000);
            assert_eq!(config.stage_timeout_ms, 5_000);
            assert_eq!(config.stage_interval_ms, 250);
            assert_eq!(config.stage_max_retries, 4);
            assert_eq!(config.login_probe_timeout_ms, 3_000);
            assert_eq!(config.confirm_timeout_ms, 9_000);
            assert_eq!(config.pacing_ms, 100);
            assert!(!config.screenshot_on_failure);
        });
    }

    #[test]
    fn from_env_rejects_bad_values() {
        with_env(&[("CROSSPOST_VERBOSE", Some("9"))], || {
            assert!(matches!(
                CrosspostConfig::from_env(),
                Err(ConfigError::InvalidEnumVariant { .. })
            ));
        });
        with_env(&[("CROSSPOST_HEADLESS", Some("maybe"))], || {
            assert!(matches!(
                CrosspostConfig::from_env(),
                Err(ConfigError::InvalidBool { .. })
            ));
        });
    }

    #[test]
    fn overrides_apply_selected_fields() {
        let base = CrosspostConfig::default();
        let updated = base.with_overrides(CrosspostConfigOverrides {
            verbose: Some(Verbosity::Detailed),
            pacing_ms: Some(10),
            ..CrosspostConfigOverrides::default()
        });
        assert_eq!(updated.verbose, Verbosity::Detailed);
        assert_eq!(updated.pacing_ms, 10);
        assert_eq!(updated.stage_timeout_ms, base.stage_timeout_ms);
    }
}
