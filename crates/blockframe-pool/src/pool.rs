//! Frame pool
//!
//! Keeps every block's frame alive independently of the document tree that
//! mounts it:
//! - Acquisition (reuse a parked frame or create one)
//! - Release (park, never destroy)
//! - Explicit reload, eviction and cache clear
//! - Message routing and readiness deadlines

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::host::{FrameHost, FrameSpec};
use crate::record::{FrameRecord, MountHandle, MountSignal};
use crate::resolver::SrcResolver;
use crate::types::{Millis, MountId, Src};
use blockframe_protocol::{
    ChannelId, Envelope, ErrorInfo, InboundMessage, MessageBus, OutboundMessage, Routed,
};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Outcome of [`FramePool::acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquisition {
    /// Frame now owned by the mount; `None` if creation or attach failed
    pub channel: Option<ChannelId>,
    /// A parked frame was adopted instead of creating one
    pub reused: bool,
}

impl Acquisition {
    const FAILED: Self = Self {
        channel: None,
        reused: false,
    };
}

/// A frame that just became ready
///
/// Returned so the caller can push the current theme into it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyTransition {
    pub channel: ChannelId,
    pub src: Src,
    pub height: f64,
    pub soft: bool,
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Frames created
    pub total_created: u64,
    /// Acquisitions served by a parked frame
    pub total_reused: u64,
    /// Explicit destructive reloads
    pub reloads: u64,
    /// Frames that reached ready through the deadline
    pub soft_ready_count: u64,
    /// Frames owned by a mount
    pub active_count: usize,
    /// Frames alive but unowned
    pub parked_count: usize,
}

/// Pool of sandboxed block frames keyed by `src`
#[derive(Debug)]
pub struct FramePool<H> {
    host: H,
    config: PoolConfig,
    resolver: SrcResolver,
    records: HashMap<ChannelId, FrameRecord>,
    /// Records per `src`, oldest first; more than one only while a second
    /// mount acquired the same `src` before the first released it
    by_src: HashMap<Src, SmallVec<[ChannelId; 2]>>,
    bus: MessageBus<Src>,
    next_channel: ChannelId,
    total_created: u64,
    total_reused: u64,
    reloads: u64,
    soft_ready_count: u64,
}

impl<H: FrameHost> FramePool<H> {
    /// Create empty pool over a host surface
    #[must_use]
    pub fn new(host: H, config: PoolConfig) -> Self {
        let resolver = SrcResolver::new(config.runtime_base_url.clone(), config.url_pattern.clone());
        Self {
            host,
            config,
            resolver,
            records: HashMap::new(),
            by_src: HashMap::new(),
            bus: MessageBus::new(),
            next_channel: ChannelId::new(1),
            total_created: 0,
            total_reused: 0,
            reloads: 0,
            soft_ready_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Give `handle` a frame for `src`
    ///
    /// A parked frame is moved into the handle's placeholder without
    /// reloading; if it is already ready the handle receives `Ready` with the
    /// last known height before this returns. If every frame for `src` is
    /// owned elsewhere, an independent frame is created and the existing
    /// owner is left alone.
    ///
    /// Host failures never escape: they are delivered to `handle` as a
    /// transient error and the acquisition reports no channel.
    pub fn acquire(&mut self, src: &Src, handle: MountHandle, now: Millis) -> Acquisition {
        let Some(channel) = self.parked_for(src) else {
            return self.spawn(src, handle, now);
        };
        let Some(record) = self.records.get_mut(&channel) else {
            return self.spawn(src, handle, now);
        };

        if let Err(err) = self.host.attach(record.node, handle.placeholder) {
            tracing::error!(%src, %channel, error = %err, "failed to attach parked frame");
            handle.signal(MountSignal::Error(ErrorInfo::load_failure(err.to_string())));
            return Acquisition::FAILED;
        }

        tracing::debug!(%src, %channel, mount = %handle.mount, ready = record.ready, "reusing parked frame");
        record.active_mount = Some(handle);

        // Parked after a failure: nothing would ever signal the new owner.
        if !record.ready && record.deadline.is_none() {
            let url = self.resolver.resolve(src);
            record.soft_ready = false;
            record.deadline = Some(now.after(self.config.ready_deadline_ms));
            if let Err(err) = self.host.navigate(record.node, &url) {
                tracing::error!(%src, %channel, error = %err, "failed to re-navigate failed frame");
                record.deadline = None;
                record.notify(MountSignal::Error(ErrorInfo::load_failure(err.to_string())));
            } else {
                tracing::debug!(%src, %channel, "re-loading frame parked after failure");
            }
        } else if record.ready {
            record.notify(MountSignal::Ready {
                height: record.height,
                soft: record.soft_ready,
            });
        }
        self.total_reused += 1;

        Acquisition {
            channel: Some(channel),
            reused: true,
        }
    }

    /// Park the frame `mount` owns for `src`
    ///
    /// The frame is hidden and detached but keeps its execution state. If a
    /// parked frame for `src` already exists, only one of the two is kept,
    /// preferring a ready one.
    ///
    /// # Errors
    /// `PoolError::NotOwner` if `mount` owns no frame for `src`.
    pub fn release(&mut self, src: &Src, mount: MountId) -> Result<ChannelId, PoolError> {
        let channel = self.owned_channel(src, mount)?;
        let sibling = self.parked_for(src);

        let mut released_ready = false;
        if let Some(record) = self.records.get_mut(&channel) {
            record.active_mount = None;
            released_ready = record.ready;
            self.host.park(record.node);
        }
        tracing::debug!(%src, %channel, %mount, "parked frame");

        if let Some(sibling) = sibling {
            let sibling_ready = self.records.get(&sibling).is_some_and(|r| r.ready);
            let surplus = if released_ready && !sibling_ready {
                sibling
            } else {
                channel
            };
            tracing::debug!(%src, channel = %surplus, "dropping surplus parked frame");
            self.destroy(surplus);
        }

        Ok(channel)
    }

    /// Destroy the frame `mount` owns for `src` and build a fresh one in the
    /// same placeholder
    ///
    /// Parked frames for `src` are discarded too, so nothing stale can be
    /// reused afterwards.
    ///
    /// # Errors
    /// `PoolError::NotOwner` if `mount` owns no frame for `src`.
    pub fn reload(
        &mut self,
        src: &Src,
        mount: MountId,
        now: Millis,
    ) -> Result<Acquisition, PoolError> {
        let channel = self.owned_channel(src, mount)?;
        let handle = self
            .records
            .get_mut(&channel)
            .and_then(|record| record.active_mount.take())
            .ok_or_else(|| PoolError::NotOwner {
                src: src.clone(),
                mount,
            })?;

        self.destroy(channel);
        self.evict(src);
        self.reloads += 1;
        tracing::info!(%src, %mount, "reloading frame");

        Ok(self.spawn(src, handle, now))
    }

    /// Load the owned frame's URL again inside the same element
    ///
    /// Keeps the record, node and channel; readiness is cleared and the
    /// deadline re-armed.
    ///
    /// # Errors
    /// `PoolError::NotOwner` if `mount` owns no frame for `src`.
    pub fn reattempt(
        &mut self,
        src: &Src,
        mount: MountId,
        now: Millis,
    ) -> Result<ChannelId, PoolError> {
        let channel = self.owned_channel(src, mount)?;
        let url = self.resolver.resolve(src);
        let deadline = now.after(self.config.ready_deadline_ms);
        let record = self
            .records
            .get_mut(&channel)
            .ok_or(PoolError::UnknownChannel(channel))?;

        record.ready = false;
        record.soft_ready = false;
        record.deadline = Some(deadline);

        if let Err(err) = self.host.navigate(record.node, &url) {
            tracing::error!(%src, %channel, error = %err, "failed to re-navigate frame");
            record.deadline = None;
            record.notify(MountSignal::Error(ErrorInfo::load_failure(err.to_string())));
        } else {
            tracing::debug!(%src, %channel, "re-attempting frame load");
        }

        Ok(channel)
    }

    /// Destroy parked frames for `src`; owned frames are untouched
    pub fn evict(&mut self, src: &Src) -> usize {
        let parked: Vec<ChannelId> = self
            .by_src
            .get(src)
            .map(|channels| {
                channels
                    .iter()
                    .copied()
                    .filter(|c| self.records.get(c).is_some_and(FrameRecord::is_parked))
                    .collect()
            })
            .unwrap_or_default();

        for channel in &parked {
            self.destroy(*channel);
        }
        parked.len()
    }

    /// Destroy every parked frame
    pub fn clear(&mut self) -> usize {
        let mut parked: Vec<ChannelId> = self
            .records
            .values()
            .filter(|r| r.is_parked())
            .map(|r| r.channel)
            .collect();
        parked.sort_unstable();

        for channel in &parked {
            self.destroy(*channel);
        }
        tracing::info!(count = parked.len(), "cleared parked frames");
        parked.len()
    }

    /// Route one inbound message to the frame that sent it
    ///
    /// Returns the ready transition when a frame reports `ready` for the
    /// first time since it last started loading.
    ///
    /// # Errors
    /// `PoolError::Protocol` for unknown senders or undecodable payloads.
    pub fn handle_envelope(
        &mut self,
        envelope: &Envelope,
    ) -> Result<Option<ReadyTransition>, PoolError> {
        let Routed {
            channel, message, ..
        } = self.bus.route(envelope)?;
        let record = self
            .records
            .get_mut(&channel)
            .ok_or(PoolError::UnknownChannel(channel))?;

        match message {
            InboundMessage::Ready { height } => {
                let first = !record.ready;
                record.ready = true;
                record.soft_ready = false;
                record.height = height;
                record.deadline = None;
                record.notify(MountSignal::Ready {
                    height,
                    soft: false,
                });

                Ok(first.then(|| ReadyTransition {
                    channel,
                    src: record.src.clone(),
                    height,
                    soft: false,
                }))
            }
            InboundMessage::Resize { height } => {
                record.height = height;
                record.notify(MountSignal::Resize { height });
                Ok(None)
            }
            InboundMessage::Error { error } => {
                let info = ErrorInfo::from(error);
                // A failed frame must not be promoted to ready by its deadline.
                record.deadline = None;
                if record.is_parked() {
                    tracing::warn!(src = %record.src, %channel, error = %info, "error from parked frame");
                }
                record.notify(MountSignal::Error(info));
                Ok(None)
            }
        }
    }

    /// Report the host's native load failure for a frame
    ///
    /// # Errors
    /// `PoolError::UnknownChannel` if the frame is not pooled.
    pub fn native_load_error(&mut self, channel: ChannelId, message: &str) -> Result<(), PoolError> {
        let record = self
            .records
            .get_mut(&channel)
            .ok_or(PoolError::UnknownChannel(channel))?;

        tracing::warn!(src = %record.src, %channel, reason = message, "frame failed to load");
        record.deadline = None;
        record.notify(MountSignal::Error(ErrorInfo::load_failure(message)));
        Ok(())
    }

    /// Promote silent frames whose deadline has passed to soft ready
    pub fn poll_deadlines(&mut self, now: Millis) -> Vec<ReadyTransition> {
        let mut due: Vec<ChannelId> = self
            .records
            .values()
            .filter(|r| !r.ready && r.deadline.is_some_and(|d| d <= now))
            .map(|r| r.channel)
            .collect();
        due.sort_unstable();

        let height = self.config.default_height;
        let mut transitions = Vec::with_capacity(due.len());
        for channel in due {
            let Some(record) = self.records.get_mut(&channel) else {
                continue;
            };
            tracing::warn!(src = %record.src, %channel, height, "no ready signal before deadline; assuming ready");
            record.ready = true;
            record.soft_ready = true;
            record.height = height;
            record.deadline = None;
            record.notify(MountSignal::Ready { height, soft: true });
            self.soft_ready_count += 1;

            transitions.push(ReadyTransition {
                channel,
                src: record.src.clone(),
                height,
                soft: true,
            });
        }
        transitions
    }

    /// Earliest pending readiness deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<Millis> {
        self.records
            .values()
            .filter(|r| !r.ready)
            .filter_map(|r| r.deadline)
            .min()
    }

    /// Post a message to one frame
    ///
    /// # Errors
    /// `PoolError::UnknownChannel` or `PoolError::Host`.
    pub fn post(&mut self, channel: ChannelId, message: &OutboundMessage) -> Result<(), PoolError> {
        let record = self
            .records
            .get(&channel)
            .ok_or(PoolError::UnknownChannel(channel))?;
        self.host.post(record.node, message)?;
        Ok(())
    }

    /// Post a message to every ready frame; returns how many received it
    pub fn broadcast(&mut self, message: &OutboundMessage) -> usize {
        let mut delivered = 0;
        for channel in self.ready_channels() {
            match self.post(channel, message) {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(%channel, error = %err, "broadcast post failed"),
            }
        }
        delivered
    }

    /// Channels of ready frames, ascending
    #[must_use]
    pub fn ready_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .records
            .values()
            .filter(|r| r.ready)
            .map(|r| r.channel)
            .collect();
        channels.sort_unstable();
        channels
    }

    #[inline]
    #[must_use]
    pub fn record(&self, channel: ChannelId) -> Option<&FrameRecord> {
        self.records.get(&channel)
    }

    /// Every frame for `src`, oldest first
    #[must_use]
    pub fn records_for(&self, src: &Src) -> Vec<&FrameRecord> {
        self.by_src
            .get(src)
            .map(|channels| channels.iter().filter_map(|c| self.records.get(c)).collect())
            .unwrap_or_default()
    }

    /// Frame `mount` owns for `src`
    #[must_use]
    pub fn owned_by(&self, src: &Src, mount: MountId) -> Option<&FrameRecord> {
        self.owned_channel(src, mount)
            .ok()
            .and_then(|c| self.records.get(&c))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get pool statistics
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let parked_count = self.records.values().filter(|r| r.is_parked()).count();
        PoolStats {
            total_created: self.total_created,
            total_reused: self.total_reused,
            reloads: self.reloads,
            soft_ready_count: self.soft_ready_count,
            active_count: self.records.len() - parked_count,
            parked_count,
        }
    }

    /// Parked frame for `src`, preferring a ready one, then the oldest
    fn parked_for(&self, src: &Src) -> Option<ChannelId> {
        self.by_src
            .get(src)?
            .iter()
            .copied()
            .filter(|c| self.records.get(c).is_some_and(FrameRecord::is_parked))
            .min_by_key(|c| !self.records.get(c).is_some_and(|r| r.ready))
    }

    fn owned_channel(&self, src: &Src, mount: MountId) -> Result<ChannelId, PoolError> {
        self.by_src
            .get(src)
            .and_then(|channels| {
                channels
                    .iter()
                    .copied()
                    .find(|c| self.records.get(c).is_some_and(|r| r.is_owned_by(mount)))
            })
            .ok_or_else(|| PoolError::NotOwner {
                src: src.clone(),
                mount,
            })
    }

    fn spawn(&mut self, src: &Src, handle: MountHandle, now: Millis) -> Acquisition {
        let channel = self.next_channel;
        self.next_channel = channel.next();

        let spec = FrameSpec {
            src: src.clone(),
            url: self.resolver.resolve(src),
            channel,
        };
        let node = match self.host.create_frame(&spec) {
            Ok(node) => node,
            Err(err) => {
                tracing::error!(%src, error = %err, "failed to create frame");
                handle.signal(MountSignal::Error(ErrorInfo::load_failure(err.to_string())));
                return Acquisition::FAILED;
            }
        };
        if let Err(err) = self.host.attach(node, handle.placeholder) {
            tracing::error!(%src, %node, error = %err, "failed to attach new frame");
            self.host.destroy(node);
            handle.signal(MountSignal::Error(ErrorInfo::load_failure(err.to_string())));
            return Acquisition::FAILED;
        }

        tracing::debug!(%src, %channel, %node, mount = %handle.mount, "created frame");
        self.records.insert(
            channel,
            FrameRecord {
                src: src.clone(),
                channel,
                node,
                ready: false,
                soft_ready: false,
                height: self.config.default_height,
                active_mount: Some(handle),
                deadline: Some(now.after(self.config.ready_deadline_ms)),
                created_at: now,
            },
        );
        self.bus.register(channel, src.clone());
        self.by_src.entry(src.clone()).or_default().push(channel);
        self.total_created += 1;

        Acquisition {
            channel: Some(channel),
            reused: false,
        }
    }

    fn destroy(&mut self, channel: ChannelId) -> Option<FrameRecord> {
        let record = self.records.remove(&channel)?;
        self.bus.unregister(channel);

        let now_empty = self.by_src.get_mut(&record.src).is_some_and(|channels| {
            channels.retain(|c| *c != channel);
            channels.is_empty()
        });
        if now_empty {
            self.by_src.remove(&record.src);
        }

        self.host.destroy(record.node);
        tracing::debug!(src = %record.src, %channel, "destroyed frame");
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_host::MemoryHost;
    use crate::types::PlaceholderId;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn pool() -> FramePool<MemoryHost> {
        FramePool::new(MemoryHost::new(), PoolConfig::default())
    }

    fn src(raw: &str) -> Src {
        Src::new(raw).unwrap()
    }

    fn mount(placeholder: u64) -> (MountHandle, UnboundedReceiver<MountSignal>) {
        MountHandle::new(MountId::new(), PlaceholderId(placeholder))
    }

    fn ready(channel: ChannelId, height: f64) -> Envelope {
        Envelope::new(channel, format!(r#"{{"type":"ready","height":{height}}}"#))
    }

    #[test]
    fn acquire_creates_then_reuses() {
        let mut pool = pool();
        let a = src("report-a");

        let (h1, _rx1) = mount(1);
        let m1 = h1.mount;
        let first = pool.acquire(&a, h1, Millis::ZERO);
        assert!(!first.reused);
        let channel = first.channel.unwrap();

        pool.release(&a, m1).unwrap();
        assert!(pool.record(channel).unwrap().is_parked());

        let (h2, _rx2) = mount(2);
        let second = pool.acquire(&a, h2, Millis::new(10));
        assert!(second.reused);
        assert_eq!(second.channel, Some(channel));
        assert_eq!(pool.host().fetch_count(&a), 1);
        assert_eq!(pool.stats().total_reused, 1);
    }

    #[test]
    fn frame_parked_after_failure_loads_again_on_reuse() {
        let mut pool = pool();
        let a = src("flaky");

        let (h1, _rx1) = mount(1);
        let m1 = h1.mount;
        let channel = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();
        pool.native_load_error(channel, "net::ERR_CONNECTION_REFUSED")
            .unwrap();
        assert_eq!(pool.next_deadline(), None);
        pool.release(&a, m1).unwrap();

        let (h2, _rx2) = mount(2);
        let second = pool.acquire(&a, h2, Millis::new(200));
        assert!(second.reused);
        assert_eq!(second.channel, Some(channel));
        assert_eq!(pool.host().fetch_count(&a), 2);
        assert_eq!(pool.next_deadline(), Some(Millis::new(5_200)));

        let transitions = pool.poll_deadlines(Millis::new(5_200));
        assert_eq!(transitions.len(), 1);
        assert!(transitions[0].soft);
    }

    #[test]
    fn reuse_of_ready_frame_signals_synchronously() {
        let mut pool = pool();
        let a = src("report-a");

        let (h1, _rx1) = mount(1);
        let m1 = h1.mount;
        let channel = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();
        pool.handle_envelope(&ready(channel, 240.0)).unwrap();
        pool.handle_envelope(&Envelope::new(channel, r#"{"type":"resize","height":300}"#))
            .unwrap();
        pool.release(&a, m1).unwrap();

        let (h2, mut rx2) = mount(2);
        pool.acquire(&a, h2, Millis::new(5));
        assert_eq!(
            rx2.try_recv().unwrap(),
            MountSignal::Ready {
                height: 300.0,
                soft: false
            }
        );
    }

    #[test]
    fn owned_frame_is_not_stolen() {
        let mut pool = pool();
        let a = src("report-a");

        let (h1, _rx1) = mount(1);
        let m1 = h1.mount;
        let c1 = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();
        let (h2, _rx2) = mount(2);
        let c2 = pool.acquire(&a, h2, Millis::ZERO).channel.unwrap();

        assert_ne!(c1, c2);
        assert!(pool.record(c1).unwrap().is_owned_by(m1));
        assert_eq!(pool.records_for(&a).len(), 2);
    }

    #[test]
    fn release_keeps_one_parked_frame_per_src() {
        let mut pool = pool();
        let a = src("report-a");

        let (h1, _rx1) = mount(1);
        let (m1, c1) = (h1.mount, pool.acquire(&a, h1, Millis::ZERO).channel.unwrap());
        let (h2, _rx2) = mount(2);
        let (m2, c2) = (h2.mount, pool.acquire(&a, h2, Millis::ZERO).channel.unwrap());
        pool.handle_envelope(&ready(c2, 50.0)).unwrap();

        pool.release(&a, m1).unwrap();
        pool.release(&a, m2).unwrap();

        // The ready duplicate survives.
        assert_eq!(pool.records_for(&a).len(), 1);
        assert!(pool.record(c1).is_none());
        assert!(pool.record(c2).is_some());
    }

    #[test]
    fn release_by_non_owner_fails() {
        let mut pool = pool();
        let a = src("report-a");
        let (h1, _rx1) = mount(1);
        pool.acquire(&a, h1, Millis::ZERO);

        let err = pool.release(&a, MountId::new()).unwrap_err();
        assert!(matches!(err, PoolError::NotOwner { .. }));
    }

    #[test]
    fn reload_replaces_frame_and_drops_parked_siblings() {
        let mut pool = pool();
        let a = src("report-a");

        let (h1, _rx1) = mount(1);
        let m1 = h1.mount;
        let old = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();

        let fresh = pool.reload(&a, m1, Millis::new(100)).unwrap();
        let fresh_channel = fresh.channel.unwrap();
        assert_ne!(fresh_channel, old);
        assert!(pool.record(old).is_none());
        assert!(pool.record(fresh_channel).unwrap().is_owned_by(m1));
        assert_eq!(pool.host().fetch_count(&a), 2);
        assert_eq!(pool.stats().reloads, 1);

        // Messages from the destroyed frame are rejected.
        assert!(pool.handle_envelope(&ready(old, 10.0)).is_err());
    }

    #[test]
    fn deadline_soft_ready_uses_default_height() {
        let mut pool = pool();
        let a = src("sales-chart");
        let (h1, mut rx1) = mount(1);
        let channel = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();

        assert_eq!(pool.next_deadline(), Some(Millis::new(5_000)));
        assert!(pool.poll_deadlines(Millis::new(4_999)).is_empty());

        let transitions = pool.poll_deadlines(Millis::new(5_000));
        assert_eq!(transitions.len(), 1);
        assert!(transitions[0].soft);
        assert_eq!(transitions[0].channel, channel);
        assert_eq!(
            rx1.try_recv().unwrap(),
            MountSignal::Ready {
                height: 100.0,
                soft: true
            }
        );
        assert_eq!(pool.next_deadline(), None);
        assert_eq!(pool.stats().soft_ready_count, 1);
    }

    #[test]
    fn error_disarms_deadline() {
        let mut pool = pool();
        let a = src("sales-chart");
        let (h1, mut rx1) = mount(1);
        let channel = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();

        pool.native_load_error(channel, "net::ERR_CONNECTION_REFUSED").unwrap();
        assert!(matches!(rx1.try_recv().unwrap(), MountSignal::Error(e) if !e.is_diagnostic()));
        assert!(pool.poll_deadlines(Millis::new(10_000)).is_empty());
    }

    #[test]
    fn reattempt_renavigates_same_node() {
        let mut pool = pool();
        let a = src("sales-chart");
        let (h1, _rx1) = mount(1);
        let m1 = h1.mount;
        let channel = pool.acquire(&a, h1, Millis::ZERO).channel.unwrap();
        pool.native_load_error(channel, "offline").unwrap();

        let again = pool.reattempt(&a, m1, Millis::new(1_000)).unwrap();
        assert_eq!(again, channel);
        assert_eq!(pool.next_deadline(), Some(Millis::new(6_000)));
        assert_eq!(pool.host().fetch_count(&a), 2);
        assert_eq!(pool.stats().total_created, 1);
    }

    #[test]
    fn create_failure_reaches_only_the_acquirer() {
        let mut pool = pool();
        pool.host_mut().fail_next_create("sandbox quota exceeded");
        let (h1, mut rx1) = mount(1);

        let acquisition = pool.acquire(&src("a"), h1, Millis::ZERO);
        assert_eq!(acquisition.channel, None);
        assert!(matches!(rx1.try_recv().unwrap(), MountSignal::Error(_)));
        assert!(pool.is_empty());
    }

    #[test]
    fn clear_only_destroys_parked() {
        let mut pool = pool();
        let (a, b) = (src("a"), src("b"));
        let (ha, _rxa) = mount(1);
        let ma = ha.mount;
        pool.acquire(&a, ha, Millis::ZERO);
        let (hb, _rxb) = mount(2);
        pool.acquire(&b, hb, Millis::ZERO);
        pool.release(&a, ma).unwrap();

        assert_eq!(pool.clear(), 1);
        assert!(pool.records_for(&a).is_empty());
        assert_eq!(pool.records_for(&b).len(), 1);
    }

    #[test]
    fn broadcast_reaches_ready_frames_only() {
        let mut pool = pool();
        let (ha, _rxa) = mount(1);
        let ca = pool.acquire(&src("a"), ha, Millis::ZERO).channel.unwrap();
        let (hb, _rxb) = mount(2);
        pool.acquire(&src("b"), hb, Millis::ZERO);
        pool.handle_envelope(&ready(ca, 10.0)).unwrap();

        assert_eq!(pool.broadcast(&OutboundMessage::GrabActivate), 1);
    }
}
