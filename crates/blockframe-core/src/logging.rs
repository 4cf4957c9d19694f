//! Logging setup
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to binaries. Logs go to stderr so replay output on stdout stays parseable.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "BLOCKFRAME_LOG";

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    pub level: String,
    pub format: LogFormat,
    /// Enable colored output (text format only)
    pub color: bool,
    /// Per-module levels, e.g. `blockframe_pool = "debug"`
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

/// Install the global subscriber
///
/// `BLOCKFRAME_LOG` takes precedence over `config.level` and `config.modules`.
///
/// # Errors
/// `ConfigError::Invalid` for bad directives or if a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_env_filter(config)?;
    let registry = Registry::default().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(config.color)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|e| ConfigError::Invalid(format!("failed to install subscriber: {e}")))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::Invalid(format!("invalid log level {:?}: {e}", config.level)))?;
    for (module, level) in &config.modules {
        let directive = format!("{module}={level}")
            .parse::<Directive>()
            .map_err(|e| ConfigError::Invalid(format!("invalid log directive: {e}")))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_directives_are_validated() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("blockframe_pool".into(), "debug".into());
        assert!(build_env_filter(&config).is_ok());

        config.modules.insert("blockframe_core".into(), "loud".into());
        assert!(matches!(
            build_env_filter(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn format_parses_lowercase() {
        let config: LoggingConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }
}
