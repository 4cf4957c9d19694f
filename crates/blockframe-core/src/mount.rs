//! Per-instance integration point between the document and the pool

use crate::collab::BlockIdentity;
use crate::debounce::Debouncer;
use crate::lifecycle::{LifecycleEvent, LifecycleState};
use crate::timer::TimerId;
use blockframe_pool::{MountHandle, MountId, MountSignal, PlaceholderId, Src};
use blockframe_protocol::ChannelId;
use tokio::sync::mpsc::UnboundedReceiver;

/// One mounted block instance
///
/// Owns the receiving end of the signals the pool sends to its frame owner,
/// the lifecycle state, and the timers that must die with the mount.
#[derive(Debug)]
pub struct MountAdapter {
    pub(crate) id: MountId,
    pub(crate) block: BlockIdentity,
    pub(crate) state: LifecycleState,
    pub(crate) channel: Option<ChannelId>,
    pub(crate) retry_timer: Option<TimerId>,
    pub(crate) height_commit: Debouncer<f64>,
    handle: MountHandle,
    signals: UnboundedReceiver<MountSignal>,
}

impl MountAdapter {
    pub(crate) fn new(
        id: MountId,
        block: BlockIdentity,
        placeholder: PlaceholderId,
        height_debounce_ms: u64,
    ) -> Self {
        let (handle, signals) = MountHandle::new(id, placeholder);
        let state = LifecycleState::new().with_height(block.height);
        Self {
            id,
            block,
            state,
            channel: None,
            retry_timer: None,
            height_commit: Debouncer::new(height_debounce_ms),
            handle,
            signals,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> MountId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn block(&self) -> &BlockIdentity {
        &self.block
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// Frame currently owned, if any
    #[inline]
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    #[inline]
    #[must_use]
    pub fn placeholder(&self) -> PlaceholderId {
        self.handle.placeholder
    }

    #[inline]
    #[must_use]
    pub fn src(&self) -> Option<&Src> {
        self.block.src.as_ref()
    }

    /// `src` for log fields
    pub(crate) fn label(&self) -> &str {
        self.block.src.as_ref().map_or("-", Src::as_str)
    }

    /// Handle to give the pool on acquisition
    pub(crate) fn handle(&self) -> MountHandle {
        self.handle.clone()
    }

    /// Next pending pool signal as a lifecycle event
    pub(crate) fn next_event(&mut self) -> Option<LifecycleEvent> {
        let signal = self.signals.try_recv().ok()?;
        Some(match signal {
            MountSignal::Ready { height, soft } => LifecycleEvent::Ready { height, soft },
            MountSignal::Resize { height } => LifecycleEvent::Resized { height },
            MountSignal::Error(info) => LifecycleEvent::Failed(info),
        })
    }

    /// Discard signals from a frame this mount no longer owns
    pub(crate) fn drain_signals(&mut self) -> usize {
        let mut dropped = 0;
        while self.signals.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
