//! Runtime configuration
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! [pool]
//! ready_deadline_ms = 5000
//! runtime_base_url = "http://localhost:55001"
//!
//! [retry]
//! max_retries = 3
//!
//! [persistence]
//! height_debounce_ms = 300
//! ```

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::retry::RetryPolicy;
use crate::theme::ThemeConfig;
use blockframe_pool::PoolConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Debounce applied to height writes into the document
pub const DEFAULT_HEIGHT_DEBOUNCE_MS: u64 = 300;

/// Height persistence settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub height_debounce_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            height_debounce_ms: DEFAULT_HEIGHT_DEBOUNCE_MS,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub pool: PoolConfig,
    pub retry: RetryPolicy,
    pub theme: ThemeConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
}

impl EmbedConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io`, `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the runtime cannot work with
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.pool.ready_deadline_ms == 0 {
            return invalid("pool.ready_deadline_ms must be positive");
        }
        if !self.pool.default_height.is_finite() || self.pool.default_height < 0.0 {
            return invalid("pool.default_height must be a finite, non-negative number");
        }
        if !self.pool.url_pattern.contains("{src}") {
            return invalid("pool.url_pattern must contain {src}");
        }
        if self.retry.base_delay_ms == 0 || self.retry.multiplier == 0 {
            return invalid("retry.base_delay_ms and retry.multiplier must be positive");
        }
        if self.theme.debounce_ms == 0 {
            return invalid("theme.debounce_ms must be positive");
        }
        if self.persistence.height_debounce_ms == 0 {
            return invalid("persistence.height_debounce_ms must be positive");
        }
        Ok(())
    }

    /// With pool configuration
    #[inline]
    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With theme configuration
    #[inline]
    #[must_use]
    pub fn with_theme(mut self, theme: ThemeConfig) -> Self {
        self.theme = theme;
        self
    }

    /// With height debounce window
    #[inline]
    #[must_use]
    pub fn with_height_debounce_ms(mut self, ms: u64) -> Self {
        self.persistence.height_debounce_ms = ms;
        self
    }
}
