//! Pool configuration

use serde::{Deserialize, Serialize};

/// Readiness deadline applied to every new frame
pub const DEFAULT_READY_DEADLINE_MS: u64 = 5_000;

/// Height assumed for frames that never report one
pub const DEFAULT_FRAME_HEIGHT: f64 = 100.0;

/// Frame pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// How long a frame may stay silent before it is treated as ready
    pub ready_deadline_ms: u64,
    /// Height used for soft-ready frames
    pub default_height: f64,
    /// Base URL of the block runtime
    pub runtime_base_url: String,
    /// URL pattern; `{base}` and `{src}` are substituted
    pub url_pattern: String,
}

impl PoolConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With readiness deadline
    #[inline]
    #[must_use]
    pub fn with_ready_deadline_ms(mut self, ms: u64) -> Self {
        self.ready_deadline_ms = ms;
        self
    }

    /// With default frame height
    #[inline]
    #[must_use]
    pub fn with_default_height(mut self, height: f64) -> Self {
        self.default_height = height;
        self
    }

    /// With runtime base URL
    #[inline]
    #[must_use]
    pub fn with_runtime_base_url(mut self, url: impl Into<String>) -> Self {
        self.runtime_base_url = url.into();
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            ready_deadline_ms: DEFAULT_READY_DEADLINE_MS,
            default_height: DEFAULT_FRAME_HEIGHT,
            runtime_base_url: "http://localhost:55001".to_string(),
            url_pattern: "{base}/_blocks/{src}".to_string(),
        }
    }
}
