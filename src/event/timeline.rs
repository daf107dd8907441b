//! The scheduled event list: one composition's events ordered by start beat,
//! read front to back by a cursor that rewinds on every loop pass.

use super::beat::Beat;
use super::types::NoteEvent;

#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<NoteEvent>,
    cursor: usize,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list. Events are ordered by beat; simultaneous
    /// events keep their given order.
    pub fn replace(&mut self, events: impl IntoIterator<Item = NoteEvent>) {
        self.events = events.into_iter().collect();
        self.events.sort_by_key(|e| e.beat);
        self.cursor = 0;
    }

    /// Take every event starting in `[from, to)` and move the cursor past
    /// them. Unread events before `from` are passed over.
    pub fn drain_range(&mut self, from: Beat, to: Beat) -> Vec<NoteEvent> {
        let pending = &self.events[self.cursor..];
        let end = pending.partition_point(|e| e.beat < to);
        let start = pending[..end].partition_point(|e| e.beat < from);
        let due = pending[start..end].to_vec();
        self.cursor += end;
        due
    }

    /// Start reading from the top again (next loop pass).
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events not yet read in this pass.
    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }
}
