//! Embedding runtime
//!
//! Owns the frame pool, every mount adapter and every timer, and routes host
//! events between them. Lifecycle decisions come from
//! [`transition`](crate::lifecycle::transition); this module only carries out
//! the returned effects.

use crate::collab::{BlockIdentity, Discard, DocumentSink, FixRequester, RepairRequest};
use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::lifecycle::{self, Effect, LifecycleEvent, LifecycleState, Phase, Presentation, Transition};
use crate::mount::MountAdapter;
use crate::theme::{StaticTheme, ThemeSource, ThemeSynchronizer};
use crate::timer::TimerQueue;
use blockframe_pool::{
    FrameHost, FramePool, Millis, MountId, PlaceholderId, PoolError, ReadyTransition, Src,
};
use blockframe_protocol::{ChannelId, Envelope, ErrorClass, ErrorInfo, OutboundMessage};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Everything the host surface can tell the runtime
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A block instance appeared in the document
    Mount {
        mount: MountId,
        block: BlockIdentity,
        placeholder: PlaceholderId,
    },
    /// The document changed a mounted block's identity
    UpdateBlock { mount: MountId, block: BlockIdentity },
    Unmount { mount: MountId },
    /// Message posted by a frame
    Message(Envelope),
    /// The host's native load failure for a frame
    LoadError { channel: ChannelId, message: String },
    /// Build failure reported out of band for a `src`
    BuildError { src: Src, error: ErrorInfo },
    /// The host's root theme attribute changed
    ThemeMutated,
    ManualRetry { mount: MountId },
    EscalateFix { mount: MountId },
    Grab { mount: MountId, active: bool },
    /// Destroy every parked frame and forget warm state
    ClearCache,
}

/// Last known state of a `src`, used to seed new mounts
#[derive(Debug, Clone, Default)]
struct WarmEntry {
    height: Option<f64>,
    error: Option<ErrorInfo>,
}

/// Pool, mounts and timers for one rendering surface
pub struct EmbedRuntime<H> {
    config: EmbedConfig,
    pool: FramePool<H>,
    mounts: IndexMap<MountId, MountAdapter>,
    retries: TimerQueue<MountId>,
    theme: ThemeSynchronizer,
    theme_source: Box<dyn ThemeSource>,
    document: Box<dyn DocumentSink>,
    fixer: Box<dyn FixRequester>,
    warm: HashMap<Src, WarmEntry>,
    theme_pushes: u64,
}

impl<H: FrameHost> EmbedRuntime<H> {
    /// Create runtime with a default theme and discarding collaborators
    #[must_use]
    pub fn new(host: H, config: EmbedConfig) -> Self {
        let pool = FramePool::new(host, config.pool.clone());
        let theme = ThemeSynchronizer::new(&config.theme);
        Self {
            config,
            pool,
            mounts: IndexMap::new(),
            retries: TimerQueue::new(),
            theme,
            theme_source: Box::new(StaticTheme::default()),
            document: Box::new(Discard),
            fixer: Box::new(Discard),
            warm: HashMap::new(),
            theme_pushes: 0,
        }
    }

    /// With the host theme to read from
    #[must_use]
    pub fn with_theme_source(mut self, source: impl ThemeSource + 'static) -> Self {
        self.theme_source = Box::new(source);
        self
    }

    /// With the document model's height sink
    #[must_use]
    pub fn with_document(mut self, document: impl DocumentSink + 'static) -> Self {
        self.document = Box::new(document);
        self
    }

    /// With the automated fix collaborator
    #[must_use]
    pub fn with_fixer(mut self, fixer: impl FixRequester + 'static) -> Self {
        self.fixer = Box::new(fixer);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn pool(&self) -> &FramePool<H> {
        &self.pool
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut FramePool<H> {
        &mut self.pool
    }

    #[inline]
    #[must_use]
    pub fn mount_adapter(&self, mount: MountId) -> Option<&MountAdapter> {
        self.mounts.get(&mount)
    }

    /// Mounted instances in mount order
    pub fn mounts(&self) -> impl Iterator<Item = &MountAdapter> {
        self.mounts.values()
    }

    #[must_use]
    pub fn state(&self, mount: MountId) -> Option<&LifecycleState> {
        self.mounts.get(&mount).map(MountAdapter::state)
    }

    #[must_use]
    pub fn presentation(&self, mount: MountId) -> Option<Presentation> {
        self.state(mount).map(LifecycleState::presentation)
    }

    #[must_use]
    pub fn channel_of(&self, mount: MountId) -> Option<ChannelId> {
        self.mounts.get(&mount).and_then(MountAdapter::channel)
    }

    /// Theme messages delivered to frames so far
    #[inline]
    #[must_use]
    pub fn theme_pushes(&self) -> u64 {
        self.theme_pushes
    }

    /// Mount a block under a fresh id
    ///
    /// # Errors
    /// Pool or lifecycle failures while starting the block.
    pub fn mount(
        &mut self,
        block: BlockIdentity,
        placeholder: PlaceholderId,
        now: Millis,
    ) -> Result<MountId> {
        let mount = MountId::new();
        self.mount_with_id(mount, block, placeholder, now)?;
        Ok(mount)
    }

    /// Mount a block under an id chosen by the host
    ///
    /// A block that already has a `src` leaves `editing` immediately. If a
    /// ready parked frame exists for it, the mount is `ready` when this
    /// returns.
    ///
    /// # Errors
    /// `EmbedError::MountExists` if `mount` is taken.
    pub fn mount_with_id(
        &mut self,
        mount: MountId,
        block: BlockIdentity,
        placeholder: PlaceholderId,
        now: Millis,
    ) -> Result<()> {
        if self.mounts.contains_key(&mount) {
            return Err(EmbedError::MountExists(mount));
        }
        let adapter = MountAdapter::new(
            mount,
            block,
            placeholder,
            self.config.persistence.height_debounce_ms,
        );
        tracing::debug!(%mount, %placeholder, src = adapter.label(), "mounted block");
        self.mounts.insert(mount, adapter);
        self.start_if_specified(mount, now)
    }

    /// Replace a mounted block's identity
    ///
    /// A changed `src` releases the old frame and starts over.
    ///
    /// # Errors
    /// `EmbedError::UnknownMount`, or pool failures while releasing.
    pub fn update_block(&mut self, mount: MountId, block: BlockIdentity, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;
        let previous = std::mem::replace(&mut adapter.block, block);

        if previous.src != adapter.block.src && adapter.state.phase != Phase::Editing {
            if let (Some(old), Some(_)) = (previous.src.as_ref(), adapter.channel.take()) {
                release_quietly(&mut self.pool, old, mount)?;
            }
            if let Some(timer) = adapter.retry_timer.take() {
                self.retries.cancel(timer);
            }
            adapter.height_commit.cancel();
            adapter.drain_signals();
            adapter.state = LifecycleState::new().with_height(adapter.block.height);
            tracing::info!(%mount, src = adapter.label(), "block source changed");
        }

        self.start_if_specified(mount, now)
    }

    /// Unmount a block instance
    ///
    /// Its frame is parked, not destroyed. Pending retry and height writes
    /// of this mount are dropped.
    ///
    /// # Errors
    /// `EmbedError::UnknownMount`, or pool failures while releasing.
    pub fn unmount(&mut self, mount: MountId) -> Result<()> {
        let mut adapter = self
            .mounts
            .shift_remove(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;

        if let Some(timer) = adapter.retry_timer.take() {
            self.retries.cancel(timer);
        }
        if let Some(height) = adapter.height_commit.cancel() {
            tracing::debug!(%mount, height, "dropped pending height write");
        }
        if let (Some(src), Some(_)) = (adapter.block.src.as_ref(), adapter.channel) {
            release_quietly(&mut self.pool, src, mount)?;
        }
        tracing::debug!(%mount, src = adapter.label(), phase = %adapter.state.phase, "unmounted block");
        Ok(())
    }

    /// Route one frame message
    ///
    /// # Errors
    /// `EmbedError::Pool` for unknown senders or malformed payloads; nothing
    /// is delivered to any mount in that case.
    pub fn deliver(&mut self, envelope: &Envelope, now: Millis) -> Result<()> {
        let ready = match self.pool.handle_envelope(envelope) {
            Ok(ready) => ready,
            Err(err) => {
                tracing::warn!(channel = %envelope.channel, error = %err, "rejected frame message");
                return Err(err.into());
            }
        };
        if let Some(ready) = ready {
            self.push_theme(&ready);
        }
        self.pump_all(now);
        Ok(())
    }

    /// Report the host's native load failure for a frame
    ///
    /// # Errors
    /// `EmbedError::Pool` if the frame is not pooled.
    pub fn native_load_error(&mut self, channel: ChannelId, message: &str, now: Millis) -> Result<()> {
        self.pool.native_load_error(channel, message)?;
        self.pump_all(now);
        Ok(())
    }

    /// Report a build failure for `src`; returns how many mounts it reached
    ///
    /// Mounts created later start from this error until a manual retry.
    ///
    /// # Errors
    /// Lifecycle failures while applying the error.
    pub fn build_error(&mut self, src: &Src, error: ErrorInfo, now: Millis) -> Result<usize> {
        let error = ErrorInfo {
            classification: ErrorClass::BuildError,
            ..error
        };
        tracing::warn!(%src, error = %error, "build failed");
        self.warm.entry(src.clone()).or_default().error = Some(error.clone());

        let targets: Vec<MountId> = self
            .mounts
            .values()
            .filter(|a| a.src() == Some(src) && a.state.phase != Phase::Editing)
            .map(MountAdapter::id)
            .collect();
        for mount in &targets {
            self.apply(*mount, LifecycleEvent::Failed(error.clone()), now)?;
        }
        Ok(targets.len())
    }

    /// User pressed retry on an error panel
    ///
    /// # Errors
    /// `LifecycleError::RetryUnavailable` outside the error phase.
    pub fn manual_retry(&mut self, mount: MountId, now: Millis) -> Result<()> {
        self.apply(mount, LifecycleEvent::ManualRetry, now)
    }

    /// User asked for an automated fix
    ///
    /// # Errors
    /// `LifecycleError::NotDiagnostic` unless a render or build error is shown.
    pub fn escalate(&mut self, mount: MountId, now: Millis) -> Result<()> {
        self.apply(mount, LifecycleEvent::EscalateFix, now)
    }

    /// Enter or leave drag-select mode in a mount's frame
    ///
    /// # Errors
    /// `EmbedError::NoFrame` if the mount owns no frame.
    pub fn set_grab(&mut self, mount: MountId, active: bool) -> Result<()> {
        let channel = self
            .mounts
            .get(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?
            .channel
            .ok_or(EmbedError::NoFrame(mount))?;
        self.pool.post(channel, &OutboundMessage::grab(active))?;
        Ok(())
    }

    /// The host's theme attribute changed
    pub fn theme_changed(&mut self, now: Millis) {
        self.theme.attribute_mutated(now);
    }

    /// Destroy parked frames and forget warm state; returns frames destroyed
    pub fn clear_cache(&mut self) -> usize {
        self.warm.clear();
        self.pool.clear()
    }

    /// Apply one host event
    ///
    /// # Errors
    /// Whatever the corresponding operation returns.
    pub fn dispatch(&mut self, event: HostEvent, now: Millis) -> Result<()> {
        match event {
            HostEvent::Mount {
                mount,
                block,
                placeholder,
            } => self.mount_with_id(mount, block, placeholder, now),
            HostEvent::UpdateBlock { mount, block } => self.update_block(mount, block, now),
            HostEvent::Unmount { mount } => self.unmount(mount),
            HostEvent::Message(envelope) => self.deliver(&envelope, now),
            HostEvent::LoadError { channel, message } => {
                self.native_load_error(channel, &message, now)
            }
            HostEvent::BuildError { src, error } => self.build_error(&src, error, now).map(|_| ()),
            HostEvent::ThemeMutated => {
                self.theme_changed(now);
                Ok(())
            }
            HostEvent::ManualRetry { mount } => self.manual_retry(mount, now),
            HostEvent::EscalateFix { mount } => self.escalate(mount, now),
            HostEvent::Grab { mount, active } => self.set_grab(mount, active),
            HostEvent::ClearCache => {
                self.clear_cache();
                Ok(())
            }
        }
    }

    /// Fire everything due at `now`
    ///
    /// Order: readiness deadlines, retry timers, height writes, theme push.
    pub fn advance(&mut self, now: Millis) {
        for ready in self.pool.poll_deadlines(now) {
            self.push_theme(&ready);
        }
        self.pump_all(now);

        for (timer, mount) in self.retries.pop_due(now) {
            let Some(adapter) = self.mounts.get_mut(&mount) else {
                continue;
            };
            if adapter.retry_timer == Some(timer) {
                adapter.retry_timer = None;
            }
            if let Err(err) = self.apply(mount, LifecycleEvent::RetryTimerFired, now) {
                tracing::warn!(%mount, error = %err, "retry failed");
            }
        }

        for adapter in self.mounts.values_mut() {
            let Some(height) = adapter.height_commit.poll(now) else {
                continue;
            };
            if let Some(src) = &adapter.block.src {
                tracing::debug!(%src, height, "committing height");
                self.document.commit_height(src, height);
                adapter.block.height = Some(height);
            }
        }

        if self.theme.poll(now) {
            let message = self.theme.message(self.theme_source.as_ref());
            let delivered = self.pool.broadcast(&message);
            self.theme_pushes += delivered as u64;
            tracing::debug!(frames = delivered, "re-pushed theme");
        }
    }

    /// Earliest instant at which [`advance`](Self::advance) has work
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Millis> {
        let heights = self
            .mounts
            .values()
            .filter_map(|a| a.height_commit.due())
            .min();
        [
            self.pool.next_deadline(),
            self.retries.next_due(),
            self.theme.due(),
            heights,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn start_if_specified(&mut self, mount: MountId, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;
        if adapter.state.phase != Phase::Editing || !adapter.block.is_specified() {
            return Ok(());
        }
        let Some(src) = adapter.block.src.clone() else {
            return Ok(());
        };

        let warm = self.warm.get(&src).cloned().unwrap_or_default();
        if warm.height.is_some() {
            adapter.state.height = warm.height;
        }

        self.apply(mount, LifecycleEvent::SourceAvailable, now)?;
        if let Some(error) = warm.error {
            if self.state(mount).is_some_and(|s| s.phase != Phase::Error) {
                self.apply(mount, LifecycleEvent::Failed(error), now)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, mount: MountId, event: LifecycleEvent, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;
        let from = adapter.state.phase;
        let Transition { state, effects } =
            lifecycle::transition(&adapter.state, event, &self.config.retry)?;
        adapter.state = state;

        let to = adapter.state.phase;
        if from != to {
            tracing::info!(%mount, src = adapter.label(), %from, %to, "lifecycle transition");
            if let Some(src) = adapter.block.src.clone() {
                let entry = self.warm.entry(src).or_default();
                match (to, &adapter.state.error) {
                    (Phase::Error, Some(error)) if error.is_diagnostic() => {
                        entry.error = Some(error.clone());
                    }
                    (Phase::Ready, _) => entry.error = None,
                    _ => {}
                }
            }
        }

        for effect in effects {
            self.run_effect(mount, effect, now)?;
        }
        Ok(())
    }

    fn run_effect(&mut self, mount: MountId, effect: Effect, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;

        match effect {
            Effect::Acquire => self.acquire(mount, now),
            Effect::ScheduleRetry { attempt, delay_ms } => {
                let timer = self.retries.schedule(now.after(delay_ms), mount);
                if let Some(stale) = adapter.retry_timer.replace(timer) {
                    self.retries.cancel(stale);
                }
                tracing::info!(%mount, src = adapter.label(), attempt, delay_ms, "scheduled retry");
                Ok(())
            }
            Effect::CancelRetry => {
                if let Some(timer) = adapter.retry_timer.take() {
                    self.retries.cancel(timer);
                }
                Ok(())
            }
            Effect::Reattempt => self.reattempt(mount, now),
            Effect::Reload => self.reload(mount, now),
            Effect::CommitHeight(height) => {
                if adapter.block.height == Some(height) && !adapter.height_commit.is_pending() {
                    return Ok(());
                }
                adapter.height_commit.push(height, now);
                if let Some(src) = adapter.block.src.clone() {
                    self.warm.entry(src).or_default().height = Some(height);
                }
                Ok(())
            }
            Effect::RequestFix(error) => {
                let src = adapter.block.src.clone().ok_or(EmbedError::NoFrame(mount))?;
                tracing::info!(%mount, %src, class = %error.classification, "requesting automated fix");
                self.fixer.request_fix(RepairRequest::new(src, &error));
                Ok(())
            }
        }
    }

    fn acquire(&mut self, mount: MountId, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;
        let Some(src) = adapter.block.src.clone() else {
            return Ok(());
        };

        let acquisition = self.pool.acquire(&src, adapter.handle(), now);
        adapter.channel = acquisition.channel;
        tracing::debug!(%mount, %src, reused = acquisition.reused, "acquired frame");
        self.pump(mount, now)
    }

    fn reattempt(&mut self, mount: MountId, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;
        let Some(src) = adapter.block.src.clone() else {
            return Ok(());
        };
        if adapter.channel.is_none() {
            return self.acquire(mount, now);
        }

        match self.pool.reattempt(&src, mount, now) {
            Ok(_) => self.pump(mount, now),
            Err(PoolError::NotOwner { .. }) => {
                adapter.channel = None;
                self.acquire(mount, now)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn reload(&mut self, mount: MountId, now: Millis) -> Result<()> {
        let adapter = self
            .mounts
            .get_mut(&mount)
            .ok_or(EmbedError::UnknownMount(mount))?;
        let Some(src) = adapter.block.src.clone() else {
            return Ok(());
        };
        self.warm.remove(&src);
        tracing::info!(%mount, %src, "reloading block");

        if adapter.channel.is_some() {
            match self.pool.reload(&src, mount, now) {
                Ok(acquisition) => {
                    adapter.channel = acquisition.channel;
                    return self.pump(mount, now);
                }
                Err(PoolError::NotOwner { .. }) => adapter.channel = None,
                Err(err) => return Err(err.into()),
            }
        }
        // Never adopt a stale parked frame on an explicit reload.
        self.pool.evict(&src);
        self.acquire(mount, now)
    }

    fn push_theme(&mut self, ready: &ReadyTransition) {
        let message = self.theme.message(self.theme_source.as_ref());
        match self.pool.post(ready.channel, &message) {
            Ok(()) => {
                self.theme_pushes += 1;
                tracing::debug!(src = %ready.src, channel = %ready.channel, soft = ready.soft, "pushed theme");
            }
            Err(err) => {
                tracing::warn!(src = %ready.src, channel = %ready.channel, error = %err, "theme push failed");
            }
        }
    }

    /// Feed a mount's pending pool signals through the state machine
    fn pump(&mut self, mount: MountId, now: Millis) -> Result<()> {
        loop {
            let Some(event) = self.mounts.get_mut(&mount).and_then(MountAdapter::next_event) else {
                return Ok(());
            };
            self.apply(mount, event, now)?;
        }
    }

    fn pump_all(&mut self, now: Millis) {
        let mounts: Vec<MountId> = self.mounts.keys().copied().collect();
        for mount in mounts {
            if let Err(err) = self.pump(mount, now) {
                tracing::warn!(%mount, error = %err, "failed to apply frame signal");
            }
        }
    }
}

/// Release a frame, treating "not the owner" as already released
fn release_quietly<H: FrameHost>(pool: &mut FramePool<H>, src: &Src, mount: MountId) -> Result<()> {
    match pool.release(src, mount) {
        Ok(channel) => {
            tracing::debug!(%src, %mount, %channel, "released frame");
            Ok(())
        }
        Err(PoolError::NotOwner { .. }) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
