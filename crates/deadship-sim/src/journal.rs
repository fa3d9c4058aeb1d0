//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bounded event journal for session debriefs."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::Duration;

use deadship_common::time::millis;
use serde::Serialize;
use strum::Display;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JournalKind {
    Transition,
    Alarm,
    Rejected,
    Valve,
    Breaker,
    Resource,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    pub at_ms: u64,
    pub kind: JournalKind,
    pub detail: String,
}

/// Ring buffer of the most recent plant events; oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct Journal {
    entries: VecDeque<JournalEntry>,
    capacity: usize,
}

impl Default for Journal {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Journal {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, at: Duration, kind: JournalKind, detail: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(JournalEntry {
            at_ms: millis(at),
            kind,
            detail: detail.into(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_entries() {
        let mut journal = Journal::with_capacity(2);
        journal.record(Duration::from_secs(1), JournalKind::Valve, "DO32 open");
        journal.record(Duration::from_secs(2), JournalKind::Transition, "stopped -> starting");
        journal.record(Duration::from_secs(4), JournalKind::Alarm, "trip");
        let kinds: Vec<_> = journal.entries().map(|entry| entry.kind).collect();
        assert_eq!(kinds, vec![JournalKind::Transition, JournalKind::Alarm]);
        assert_eq!(journal.last().map(|entry| entry.at_ms), Some(4_000));
    }
}
