//! Global `tracing` subscriber installation.
//!
//! [`TracingSetup`] installs a registry with an [`EnvFilter`] and one `fmt`
//! layer. Installation is idempotent: if a global subscriber already exists
//! the call is a no-op, so tests and embedding applications keep their own.
//!
//! # Example
//!
//! ```
//! use keel_core::{TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! let config = TracingSetup::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("keel=debug,keel::audit=warn")
//!     .init();
//!
//! assert_eq!(config.level, Level::DEBUG);
//! ```

use core::fmt;
use core::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl TracingFormat {
    /// Lowercase name accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`TracingFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tracing format `{0}`")]
pub struct ParseTracingFormatError(pub String);

impl FromStr for TracingFormat {
    type Err = ParseTracingFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ParseTracingFormatError(s.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The configuration a [`TracingSetup`] installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSetup
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TracingSetup {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "keel=debug,keel::audit=warn").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingSetup {
    /// Creates a new `TracingSetup` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An unparsable filter falls
    /// back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// The configuration this setup would install.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    /// The `fmt` layer for the configured format, boxed so every format
    /// installs through the same registry.
    fn output_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        let layer = tracing_subscriber::fmt::layer().with_span_events(self.span_events());
        match self.format {
            TracingFormat::Pretty => layer.pretty().boxed(),
            TracingFormat::Compact => layer.compact().boxed(),
            TracingFormat::Json => layer.json().boxed(),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Does nothing if a global subscriber is already set.
    pub fn init(self) -> TracingConfig {
        let installed = tracing_subscriber::registry()
            .with(self.filter())
            .with(self.output_layer())
            .try_init()
            .is_ok();

        if installed {
            tracing::info!(
                level = %self.level,
                format = %self.format,
                "tracing initialized"
            );
        } else {
            tracing::debug!("global subscriber already set, keeping it");
        }

        self.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn tracing_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<TracingFormat>(), Ok(TracingFormat::Json));
        assert_eq!(
            " compact ".parse::<TracingFormat>(),
            Ok(TracingFormat::Compact)
        );
        assert_eq!(
            "xml".parse::<TracingFormat>(),
            Err(ParseTracingFormatError("xml".to_owned()))
        );
    }

    #[test]
    fn setup_default_level_is_info() {
        assert_eq!(TracingSetup::default().level, Level::INFO);
    }

    #[test]
    fn setup_builders_apply() {
        let setup = TracingSetup::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("keel=debug")
            .with_span_events(true);

        assert_eq!(setup.env_filter, Some("keel=debug".to_owned()));
        assert!(setup.span_events);
        assert_eq!(
            setup.config(),
            TracingConfig {
                level: Level::DEBUG,
                format: TracingFormat::Json,
            }
        );
    }

    #[test]
    fn span_events_follow_the_flag() {
        assert_eq!(TracingSetup::new().span_events(), FmtSpan::NONE);
        assert_eq!(
            TracingSetup::new().with_span_events(true).span_events(),
            FmtSpan::ENTER | FmtSpan::EXIT
        );
    }

    #[test]
    fn init_twice_keeps_first_subscriber() {
        let first = TracingSetup::new().with_format(TracingFormat::Compact).init();
        let second = TracingSetup::new().with_level(Level::WARN).init();

        assert_eq!(first.format, TracingFormat::Compact);
        assert_eq!(second.level, Level::WARN);
    }
}
