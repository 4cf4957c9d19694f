//! Error types for Blockframe Core
//!
//! Lifecycle errors come from user actions that do not apply to the current
//! phase. Everything else is wrapped from the crates below.

use crate::lifecycle::Phase;
use blockframe_pool::{MountId, PoolError};
use blockframe_protocol::ProtocolError;
use std::path::PathBuf;

/// Main runtime error type
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// No mount with this id
    #[error("unknown mount: {0}")]
    UnknownMount(MountId),

    /// Mount id already in use
    #[error("mount already exists: {0}")]
    MountExists(MountId),

    /// Mount has no frame to talk to
    #[error("mount {0} owns no frame")]
    NoFrame(MountId),

    /// Frame pool failure
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Wire protocol failure
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Action rejected by the lifecycle controller
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EmbedError {
    /// Check if repeating the operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pool(err) if err.is_host_failure())
    }

    /// Check if error is a rejected user action rather than a fault
    #[inline]
    #[must_use]
    pub fn is_rejected_action(&self) -> bool {
        matches!(
            self,
            Self::Lifecycle(LifecycleError::RetryUnavailable(_) | LifecycleError::NotDiagnostic)
        )
    }
}

/// Lifecycle controller errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Transition outside the allowed graph
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: Phase, to: Phase },

    /// Manual retry requested outside the error phase
    #[error("manual retry is only available from error, not {0}")]
    RetryUnavailable(Phase),

    /// Fix requested for an error that is not a render or build error
    #[error("only render and build errors can be escalated")]
    NotDiagnostic,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias
pub type Result<T, E = EmbedError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use blockframe_pool::HostError;

    #[test]
    fn host_failures_are_retryable() {
        let err = EmbedError::from(PoolError::from(HostError::CreateFailed("quota".into())));
        assert!(err.is_retryable());
        assert!(!EmbedError::UnknownMount(MountId::new()).is_retryable());
    }

    #[test]
    fn rejected_actions_are_flagged() {
        let err = EmbedError::from(LifecycleError::RetryUnavailable(Phase::Ready));
        assert!(err.is_rejected_action());
        assert_eq!(
            err.to_string(),
            "lifecycle error: manual retry is only available from error, not ready"
        );
    }
}
