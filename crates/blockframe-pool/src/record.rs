//! Frame records and mount handles

use crate::host::NodeId;
use crate::types::{Millis, MountId, PlaceholderId, Src};
use blockframe_protocol::{ChannelId, ErrorInfo};
use tokio::sync::mpsc;

/// Signals delivered from the pool to the mount that owns a frame
#[derive(Debug, Clone, PartialEq)]
pub enum MountSignal {
    /// Frame is ready; `soft` when readiness came from the deadline
    Ready { height: f64, soft: bool },
    /// Content height changed
    Resize { height: f64 },
    /// Frame or content failed
    Error(ErrorInfo),
}

/// Owner side of one acquisition: where to show the frame, and where to
/// deliver its signals
#[derive(Debug, Clone)]
pub struct MountHandle {
    pub mount: MountId,
    pub placeholder: PlaceholderId,
    sender: mpsc::UnboundedSender<MountSignal>,
}

impl MountHandle {
    /// Create handle plus the receiver the mount drains
    #[must_use]
    pub fn new(
        mount: MountId,
        placeholder: PlaceholderId,
    ) -> (Self, mpsc::UnboundedReceiver<MountSignal>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                mount,
                placeholder,
                sender,
            },
            receiver,
        )
    }

    /// Deliver a signal; false if the mount is gone
    pub fn signal(&self, signal: MountSignal) -> bool {
        self.sender.send(signal).is_ok()
    }

    /// Same mount, different placeholder
    #[must_use]
    pub fn with_placeholder(&self, placeholder: PlaceholderId) -> Self {
        Self {
            mount: self.mount,
            placeholder,
            sender: self.sender.clone(),
        }
    }
}

/// One pooled frame
///
/// `active_mount == None` means parked: hidden, detached, but alive.
#[derive(Debug)]
pub struct FrameRecord {
    pub src: Src,
    pub channel: ChannelId,
    pub node: NodeId,
    pub ready: bool,
    /// Readiness came from the deadline rather than a `ready` message
    pub soft_ready: bool,
    /// Last known content height
    pub height: f64,
    pub active_mount: Option<MountHandle>,
    /// Readiness deadline while loading
    pub deadline: Option<Millis>,
    pub created_at: Millis,
}

impl FrameRecord {
    /// Whether no mount currently owns the frame
    #[inline]
    #[must_use]
    pub fn is_parked(&self) -> bool {
        self.active_mount.is_none()
    }

    /// Whether `mount` owns the frame
    #[inline]
    #[must_use]
    pub fn is_owned_by(&self, mount: MountId) -> bool {
        self.active_mount.as_ref().is_some_and(|h| h.mount == mount)
    }

    /// Send a signal to the owner, if any
    pub(crate) fn notify(&self, signal: MountSignal) {
        if let Some(handle) = &self.active_mount {
            if !handle.signal(signal) {
                tracing::debug!(src = %self.src, channel = %self.channel, "owner dropped its signal receiver");
            }
        }
    }
}
