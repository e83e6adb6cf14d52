//! Log subscriber setup for the questionnaire tools.
//!
//! Filter precedence: `LCQ_LOG`, then `RUST_LOG`, then `APP_LOG_LEVEL` from config.

use crate::config::{AppConfig, AppEnvironment};
use std::env;
use std::fmt;
use std::io::IsTerminal;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "LCQ_LOG";

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter {
        directive: String,
        source: ParseError,
    },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { directive, source } => {
                write!(f, "log filter '{directive}' is not valid: {source}")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "a log subscriber is already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Install the global subscriber on stderr so command output on stdout stays clean.
pub fn init(config: &AppConfig) -> Result<(), TelemetryError> {
    let directive = filter_directive(
        env::var(LOG_FILTER_ENV).ok(),
        env::var(EnvFilter::DEFAULT_ENV).ok(),
        &config.telemetry.log_level,
    );
    let filter = build_filter(&directive)?;
    let ansi =
        config.environment == AppEnvironment::Development && std::io::stderr().is_terminal();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(ansi)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)
}

/// First non-blank override wins; the configured level is the fallback.
fn filter_directive(
    lcq_override: Option<String>,
    rust_log: Option<String>,
    configured: &str,
) -> String {
    [lcq_override, rust_log]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| configured.trim().to_string())
}

fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcq_override_beats_rust_log_and_config() {
        assert_eq!(
            filter_directive(Some("lcq=debug".into()), Some("warn".into()), "info"),
            "lcq=debug"
        );
        assert_eq!(
            filter_directive(Some("  ".into()), Some("warn".into()), "info"),
            "warn"
        );
        assert_eq!(filter_directive(None, None, " info "), "info");
    }

    #[test]
    fn malformed_directives_are_reported() {
        assert!(build_filter("lcq=debug,warn").is_ok());
        match build_filter("lcq=notalevel") {
            Err(TelemetryError::InvalidFilter { directive, .. }) => {
                assert_eq!(directive, "lcq=notalevel")
            }
            other => panic!("expected invalid filter, got {other:?}"),
        }
    }
}
