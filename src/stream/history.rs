use std::collections::VecDeque;

use super::types::{HistoryEntry, InboundEvent};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Fixed-capacity history of classified events, newest first
///
/// Pushing past capacity evicts the oldest entry. Entries are never mutated
/// after creation; ids are monotonic for the lifetime of the buffer.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub fn push(&mut self, event: InboundEvent) -> HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id,
            event,
        };
        self.next_id += 1;

        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);

        entry
    }

    /// Snapshot of the retained entries, newest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
