//! Deadline-ordered timer queue driven by explicit time

use blockframe_pool::Millis;
use std::collections::{BTreeMap, HashMap};

/// Handle for cancelling a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Timers ordered by due time, then by scheduling order
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: BTreeMap<(Millis, u64), T>,
    due_at: HashMap<TimerId, Millis>,
    next_seq: u64,
}

impl<T> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            due_at: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `payload` to fire at `at`
    pub fn schedule(&mut self, at: Millis, payload: T) -> TimerId {
        let id = TimerId(self.next_seq);
        self.next_seq += 1;
        self.entries.insert((at, id.0), payload);
        self.due_at.insert(id, at);
        id
    }

    /// Cancel a timer; `None` if it already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let at = self.due_at.remove(&id)?;
        self.entries.remove(&(at, id.0))
    }

    /// Remove and return every timer due at or before `now`, earliest first
    pub fn pop_due(&mut self, now: Millis) -> Vec<(TimerId, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, seq), payload) = entry.remove_entry();
            let id = TimerId(seq);
            self.due_at.remove(&id);
            due.push((id, payload));
        }
        due
    }

    /// Earliest due time
    #[must_use]
    pub fn next_due(&self) -> Option<Millis> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(Millis::new(300), "c");
        q.schedule(Millis::new(100), "a");
        q.schedule(Millis::new(100), "b");

        assert_eq!(q.next_due(), Some(Millis::new(100)));
        let fired: Vec<_> = q.pop_due(Millis::new(100)).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let id = q.schedule(Millis::new(10), 1);
        assert_eq!(q.cancel(id), Some(1));
        assert_eq!(q.cancel(id), None);
        assert!(q.pop_due(Millis::new(1_000)).is_empty());
        assert_eq!(q.next_due(), None);
    }
}
