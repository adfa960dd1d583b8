//! Bounded in-memory event log.
//!
//! [`EventLog`] keeps the most recent events up to a fixed capacity. When
//! full, the oldest event is evicted and a drop counter increments, so
//! appending never fails and never grows memory without bound.

use std::collections::VecDeque;
use std::io::Write;

use hearth_types::EventKind;

use crate::error::EventError;
use crate::event::{Telemetry, TradeEvent};

/// Fixed-capacity ring buffer of [`TradeEvent`]s.
#[derive(Debug, Clone)]
pub struct EventLog {
    /// Retained events, oldest first.
    events: VecDeque<TradeEvent>,
    /// Maximum number of retained events.
    capacity: usize,
    /// Events evicted because the buffer was full.
    dropped: u64,
    /// Events ever appended.
    total: u64,
}

impl EventLog {
    /// Create a log retaining at most `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            dropped: 0,
            total: 0,
        }
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TradeEvent> {
        self.events.iter()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of retained events.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events evicted so far.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Events appended so far.
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of retained events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Remove and return all retained events.
    pub fn drain(&mut self) -> Vec<TradeEvent> {
        self.events.drain(..).collect()
    }

    /// Write retained events as JSON lines.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] if serialization or the writer fails.
    pub fn write_json_lines<W: Write>(&self, mut writer: W) -> Result<(), EventError> {
        for event in &self.events {
            serde_json::to_writer(&mut writer, event)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Telemetry for EventLog {
    fn append_event(&mut self, event: TradeEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        self.events.push_back(event);
        self.total = self.total.saturating_add(1);
    }
}
