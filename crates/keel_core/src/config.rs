//! Application configuration.
//!
//! [`AppConfig`] is read once at startup and passed explicitly to
//! [`App::new`](crate::App::new). Every key is validated before anything is
//! returned, so a single failed load reports all offending keys at once.

use core::str::FromStr;
use core::time::Duration;

use keel_outcome::{Cause, ErrorKind, Failure, Outcome, Stage};
use keel_resource::ResourceSettings;
use tracing::Level;

use crate::tracing_setup::{TracingFormat, TracingSetup};

/// Required application name.
pub const APP_NAME_KEY: &str = "KEEL_APP_NAME";
/// Deployment stage, see [`Stage`].
pub const APP_STAGE_KEY: &str = "KEEL_APP_STAGE";
/// Maximum log level.
pub const LOG_LEVEL_KEY: &str = "KEEL_LOG_LEVEL";
/// Log output format, see [`TracingFormat`].
pub const LOG_FORMAT_KEY: &str = "KEEL_LOG_FORMAT";
/// Gate for `clear` and `clear_all`.
pub const EMPTYING_ALLOWED_KEY: &str = "KEEL_EMPTYING_ALLOWED";
/// Release grace period in milliseconds.
pub const RELEASE_GRACE_MS_KEY: &str = "KEEL_RELEASE_GRACE_MS";

/// A configuration key that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required key is not set.
    #[error("missing required configuration key {0}")]
    Missing(&'static str),
    /// A key is set but its value does not parse.
    #[error("invalid value `{value}` for {key}, expected {expected}")]
    Invalid {
        /// The offending key.
        key: &'static str,
        /// The raw value found.
        value: String,
        /// What the key accepts.
        expected: &'static str,
    },
}

/// Failures of configuration loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigErrorKind {
    /// At least one key is missing or invalid.
    Validation,
}

impl ErrorKind for ConfigErrorKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Validation => "ConfigValidationError",
        }
    }
}

/// Application-level configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Application name, used in logs and health reports.
    pub name: String,
    /// Deployment stage; selects the error disclosure tier.
    pub stage: Stage,
    /// Maximum log level.
    pub log_level: Level,
    /// Log output format.
    pub log_format: TracingFormat,
    /// Settings handed to the resource manager.
    pub resources: ResourceSettings,
}

impl AppConfig {
    /// Creates a configuration with default values for everything but the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: Stage::default(),
            log_level: Level::INFO,
            log_format: TracingFormat::default(),
            resources: ResourceSettings::default(),
        }
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    /// Sets the resource settings.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceSettings) -> Self {
        self.resources = resources;
        self
    }

    /// Loads `.env` if present, then reads the process environment.
    #[track_caller]
    pub fn from_env() -> Outcome<Self, ConfigErrorKind> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    ///
    /// Unset optional keys take their defaults. Empty values count as unset.
    #[track_caller]
    pub fn from_lookup<F>(lookup: F) -> Outcome<Self, ConfigErrorKind>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut errors = Vec::new();

        let name = read(APP_NAME_KEY);
        if name.is_none() {
            errors.push(ConfigError::Missing(APP_NAME_KEY));
        }

        let stage: Option<Stage> = parse(
            read(APP_STAGE_KEY),
            APP_STAGE_KEY,
            "development, testing, staging or production",
            &mut errors,
        );
        let log_level: Option<Level> = parse(
            read(LOG_LEVEL_KEY),
            LOG_LEVEL_KEY,
            "trace, debug, info, warn or error",
            &mut errors,
        );
        let log_format: Option<TracingFormat> = parse(
            read(LOG_FORMAT_KEY),
            LOG_FORMAT_KEY,
            "pretty, compact or json",
            &mut errors,
        );
        let emptying_allowed: Option<bool> = parse(
            read(EMPTYING_ALLOWED_KEY),
            EMPTYING_ALLOWED_KEY,
            "true or false",
            &mut errors,
        );
        let release_grace_ms: Option<u64> = parse(
            read(RELEASE_GRACE_MS_KEY),
            RELEASE_GRACE_MS_KEY,
            "a whole number of milliseconds",
            &mut errors,
        );

        let Some(name) = name.filter(|_| errors.is_empty()) else {
            let invalid: Vec<&'static str> = errors.iter().map(ConfigError::key).collect();
            return Failure::build("invalid configuration", ConfigErrorKind::Validation)
                .details(serde_json::json!({ "invalid": invalid }))
                .causes(errors.into_iter().map(Cause::error))
                .into_outcome();
        };

        let mut resources = ResourceSettings::default();
        if let Some(allowed) = emptying_allowed {
            resources = resources.with_emptying_allowed(allowed);
        }
        if let Some(millis) = release_grace_ms {
            resources = resources.with_release_grace(Duration::from_millis(millis));
        }

        Outcome::success(
            "config loaded",
            Self {
                name,
                stage: stage.unwrap_or_default(),
                log_level: log_level.unwrap_or(Level::INFO),
                log_format: log_format.unwrap_or_default(),
                resources,
            },
        )
    }

    /// Tracing setup matching this configuration.
    #[must_use]
    pub fn tracing(&self) -> TracingSetup {
        TracingSetup::new()
            .with_level(self.log_level)
            .with_format(self.log_format)
    }
}

impl ConfigError {
    /// The key this error is about.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Missing(key) | Self::Invalid { key, .. } => *key,
        }
    }
}

fn parse<T: FromStr>(
    raw: Option<String>,
    key: &'static str,
    expected: &'static str,
    errors: &mut Vec<ConfigError>,
) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(ConfigError::Invalid {
                key,
                value: raw,
                expected,
            });
            None
        }
    }
}
