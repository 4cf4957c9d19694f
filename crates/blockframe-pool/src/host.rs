//! Host surface seam
//!
//! The pool never touches a DOM directly. Everything it does to a frame
//! element goes through [`FrameHost`], which a browser binding implements
//! over real iframes and [`MemoryHost`](crate::memory_host::MemoryHost)
//! implements headlessly.

use crate::error::HostError;
use crate::types::{PlaceholderId, Src};
use blockframe_protocol::{ChannelId, OutboundMessage};
use serde::{Deserialize, Serialize};

/// Handle to a frame element owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Everything a host needs to build a frame element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    pub src: Src,
    pub url: String,
    /// Channel the host must tag this frame's messages with
    pub channel: ChannelId,
}

/// Operations the pool performs on frame elements
///
/// Implementations must keep a node's execution state alive across
/// [`park`](FrameHost::park) and a later [`attach`](FrameHost::attach);
/// only [`destroy`](FrameHost::destroy) and
/// [`navigate`](FrameHost::navigate) may restart the content.
pub trait FrameHost {
    /// Create a frame element and start loading `spec.url`
    ///
    /// # Errors
    /// `HostError::CreateFailed` if the element cannot be created.
    fn create_frame(&mut self, spec: &FrameSpec) -> Result<NodeId, HostError>;

    /// Move a frame into a placeholder and show it
    ///
    /// # Errors
    /// `HostError::AttachFailed` or `HostError::UnknownNode`.
    fn attach(&mut self, node: NodeId, placeholder: PlaceholderId) -> Result<(), HostError>;

    /// Detach a frame from its placeholder and hide it, keeping it alive
    fn park(&mut self, node: NodeId);

    /// Load `url` again inside the same frame element
    ///
    /// # Errors
    /// `HostError::NavigateFailed` or `HostError::UnknownNode`.
    fn navigate(&mut self, node: NodeId, url: &str) -> Result<(), HostError>;

    /// Remove the frame element and end its execution context
    fn destroy(&mut self, node: NodeId);

    /// Post a message into the frame
    ///
    /// # Errors
    /// `HostError::PostFailed` or `HostError::UnknownNode`.
    fn post(&mut self, node: NodeId, message: &OutboundMessage) -> Result<(), HostError>;
}
