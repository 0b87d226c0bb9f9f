//! Cancellable delayed queue.
//!
//! Replaces per-object OS timers: callers schedule payloads at absolute
//! deadlines and drain whatever is due when they next observe the clock.

use std::collections::{BTreeMap, HashMap};

/// Handle for cancelling a scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_seq: u64,
    /// Ordered by deadline, then by scheduling order.
    entries: BTreeMap<(i64, u64), T>,
    deadlines: HashMap<u64, i64>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `payload` to become due at `deadline_ms`.
    pub fn schedule(&mut self, deadline_ms: i64, payload: T) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((deadline_ms, seq), payload);
        self.deadlines.insert(seq, deadline_ms);
        TimerId(seq)
    }

    /// Cancels an entry, returning its payload if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id.0)?;
        self.entries.remove(&(deadline, id.0))
    }

    /// Removes and returns every entry due at or before `now_ms`, in deadline order.
    pub fn drain_due(&mut self, now_ms: i64) -> Vec<(TimerId, T)> {
        let due = match now_ms.checked_add(1) {
            Some(bound) => {
                let pending = self.entries.split_off(&(bound, 0));
                std::mem::replace(&mut self.entries, pending)
            }
            None => std::mem::take(&mut self.entries),
        };

        due.into_iter()
            .map(|((_, seq), payload)| {
                self.deadlines.remove(&seq);
                (TimerId(seq), payload)
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
