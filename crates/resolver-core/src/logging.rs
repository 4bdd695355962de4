//! Tracing subscriber setup.
//!
//! This service has no log aggregation or alerting subsystem to configure,
//! so only env-filter + format-selection logic lives here.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize the global `tracing` subscriber from `config`. Call once, at
/// process startup.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::internal(format!("invalid log level '{}': {e}", config.level)))?;

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
    }

    Ok(())
}

/// Validate a log level string.
pub fn validate_log_level(level: &str) -> Result<()> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(Error::malformed(format!(
            "invalid log level '{other}': must be one of trace, debug, info, warn, error"
        ))),
    }
}

/// Validate a log format string.
pub fn validate_log_format(format: &str) -> Result<()> {
    match format {
        "json" | "pretty" | "compact" => Ok(()),
        other => Err(Error::malformed(format!(
            "invalid log format '{other}': must be one of json, pretty, compact"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "INFO"] {
            assert!(validate_log_level(level).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(validate_log_level("verbose").is_err());
    }

    #[test]
    fn accepts_known_formats() {
        for format in ["json", "pretty", "compact"] {
            assert!(validate_log_format(format).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(validate_log_format("xml").is_err());
    }
}
