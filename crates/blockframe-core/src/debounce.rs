//! Trailing-edge debouncer

use blockframe_pool::Millis;

/// Holds the latest value until `window_ms` passes without a newer one
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window_ms: u64,
    pending: Option<(T, Millis)>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            pending: None,
        }
    }

    /// Replace the pending value and restart the window
    pub fn push(&mut self, value: T, now: Millis) {
        self.pending = Some((value, now.after(self.window_ms)));
    }

    /// Take the pending value if its window has elapsed
    pub fn poll(&mut self, now: Millis) -> Option<T> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// When the pending value becomes due
    #[must_use]
    pub fn due(&self) -> Option<Millis> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Drop the pending value
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
