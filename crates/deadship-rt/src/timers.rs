//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Runtime helpers supporting the simulator."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Owner-local set of cancellable timers driven by a virtual clock.
//!
//! Each subsystem owns one [`TimerSet`] keyed by purpose, so a given purpose
//! has at most one pending timer. Nothing here reads the wall clock: callers
//! pass the current virtual instant in and pull due timers out with
//! [`TimerSet::pop_due`]. Timers due at the same instant fire in the order
//! they were (re)armed.

use std::hash::Hash;
use std::time::Duration;

use indexmap::IndexMap;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    /// Virtual instant at which the timer fires next.
    pub due: Duration,
    /// Re-arm period for interval timers.
    pub period: Option<Duration>,
    sequence: u64,
}

/// A timer popped from the set, together with the instant it fired at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<K> {
    pub key: K,
    pub at: Duration,
}

#[derive(Debug, Clone)]
pub struct TimerSet<K> {
    pending: IndexMap<K, PendingTimer>,
    sequence: u64,
}

impl<K> Default for TimerSet<K> {
    fn default() -> Self {
        Self {
            pending: IndexMap::new(),
            sequence: 0,
        }
    }
}

impl<K> TimerSet<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer, replacing any pending timer with the same key.
    pub fn schedule_once(&mut self, key: K, now: Duration, delay: Duration) -> Duration {
        let due = now.saturating_add(delay);
        let timer = self.next_timer(due, None);
        self.pending.insert(key, timer);
        due
    }

    /// Arm a recurring timer unless one with the same key is already pending.
    ///
    /// The first firing happens one full period after `now`.
    pub fn schedule_interval_if_absent(&mut self, key: K, now: Duration, period: Duration) -> bool {
        if self.pending.contains_key(&key) {
            return false;
        }
        let period = period.max(MIN_PERIOD);
        let timer = self.next_timer(now.saturating_add(period), Some(period));
        self.pending.insert(key, timer);
        true
    }

    pub fn cancel(&mut self, key: K) -> bool {
        self.pending.shift_remove(&key).is_some()
    }

    /// Drop every pending timer, returning how many were outstanding.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending.contains_key(&key)
    }

    pub fn get(&self, key: K) -> Option<&PendingTimer> {
        self.pending.get(&key)
    }

    /// Earliest instant at which any pending timer fires.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.values().map(|timer| timer.due).min()
    }

    /// Remove and return the earliest timer due at or before `until`.
    ///
    /// Interval timers are re-armed at `due + period` before returning, so the
    /// caller may cancel them from inside its handler.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<K>> {
        let (index, key, timer) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, timer))| timer.due <= until)
            .min_by_key(|(_, (_, timer))| (timer.due, timer.sequence))
            .map(|(index, (key, timer))| (index, *key, *timer))?;

        match timer.period {
            Some(period) => {
                let rearmed = self.next_timer(timer.due.saturating_add(period), Some(period));
                if let Some(slot) = self.pending.get_index_mut(index) {
                    *slot.1 = rearmed;
                }
            }
            None => {
                self.pending.shift_remove_index(index);
            }
        }
        Some(Fired {
            key,
            at: timer.due,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.pending.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn next_timer(&mut self, due: Duration, period: Option<Duration>) -> PendingTimer {
        self.sequence += 1;
        PendingTimer {
            due,
            period,
            sequence: self.sequence,
        }
    }
}
