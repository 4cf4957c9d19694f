//! Error types for the frame pool

use crate::host::NodeId;
use crate::types::{MountId, PlaceholderId, Src};
use blockframe_protocol::{ChannelId, ProtocolError};

/// Frame pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Content identifier failed validation
    #[error("invalid src: {0:?}")]
    InvalidSrc(String),

    /// No frame for `src` is owned by this mount
    #[error("mount {mount} does not own a frame for {src}")]
    NotOwner { src: Src, mount: MountId },

    /// Channel is not tracked by the pool
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),

    /// Message could not be routed or decoded
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Host surface rejected an operation
    #[error("host error: {0}")]
    Host(#[from] HostError),
}

/// Failures reported by a [`FrameHost`](crate::host::FrameHost)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Frame element could not be created
    #[error("frame creation failed: {0}")]
    CreateFailed(String),

    /// Frame could not be moved into its placeholder
    #[error("attach of {node} to {placeholder} failed: {reason}")]
    AttachFailed {
        node: NodeId,
        placeholder: PlaceholderId,
        reason: String,
    },

    /// Frame could not be pointed at its URL again
    #[error("navigation of {node} failed: {reason}")]
    NavigateFailed { node: NodeId, reason: String },

    /// Message could not be posted into the frame
    #[error("post to {node} failed: {reason}")]
    PostFailed { node: NodeId, reason: String },

    /// Node is not known to the host
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
}

impl PoolError {
    /// Whether the error came from the host surface rather than bookkeeping
    #[inline]
    #[must_use]
    pub fn is_host_failure(&self) -> bool {
        matches!(self, Self::Host(_))
    }
}
