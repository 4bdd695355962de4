//! Ambient service configuration: TOML file plus environment overrides
//! (`config` crate + `toml`), covering the settings this service actually
//! has (server bind address, spec storage directory, logging).

use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Specification persistence configuration.
    pub persistence: PersistenceConfig,
}

/// HTTP server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log format (json, pretty, compact).
    pub format: String,
}

/// On-disk specification persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding one JSON file per specification.
    pub spec_dir: String,
}

impl Config {
    /// Construct the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file, overlaid by `RESOLVER_`-prefixed
    /// environment variables.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = ConfigBuilder::builder()
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config")))
            .add_source(Environment::with_prefix("RESOLVER").separator("_"));

        let built = builder
            .build()
            .map_err(|e| Error::internal(format!("failed to build configuration: {e}")))?;

        built
            .try_deserialize()
            .map_err(|e| Error::internal(format!("failed to deserialize configuration: {e}")))
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        let builder =
            ConfigBuilder::builder().add_source(Environment::with_prefix("RESOLVER").separator("_"));

        let built = builder.build().map_err(|e| {
            Error::internal(format!("failed to build configuration from environment: {e}"))
        })?;

        built
            .try_deserialize()
            .map_err(|e| Error::internal(format!("failed to deserialize configuration: {e}")))
    }

    /// Validate the configuration for obvious misconfiguration.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(Error::malformed("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(Error::malformed("server.port must be greater than 0"));
        }
        crate::logging::validate_log_level(&self.logging.level)?;
        crate::logging::validate_log_format(&self.logging.format)?;
        if self.persistence.spec_dir.is_empty() {
            return Err(Error::malformed("persistence.spec_dir must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            persistence: PersistenceConfig {
                spec_dir: "./specs".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn empty_host_fails_validation() {
        let mut config = Config::default();
        config.server.host = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_log_level_fails_validation() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_round_trips_toml() {
        let temp = NamedTempFile::with_suffix(".toml").unwrap();
        std::fs::write(
            temp.path(),
            r#"
            [server]
            host = "0.0.0.0"
            port = 9090

            [logging]
            level = "debug"
            format = "json"

            [persistence]
            spec_dir = "/tmp/specs"
            "#,
        )
        .unwrap();

        let loaded = Config::from_file(temp.path()).unwrap();
        assert_eq!(loaded.server.port, 9090);
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.persistence.spec_dir, "/tmp/specs");
    }
}
