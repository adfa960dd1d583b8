//! Provider queues: FIFO waiting lines with fixed slot reservation.
//!
//! Each provider owns one queue. Entries keep insertion order; the entry at
//! the front is the one allowed to trade. Every entry holds a slot index
//! (the lowest slot free when it joined) that maps to a waiting position
//! at the provider's anchor. Slots are not reassigned when the line moves.
//!
//! A provider also carries a `busy_until` time set after each trade, during
//! which no further trade with it may execute.

use std::collections::BTreeMap;

use hearth_types::{AgentId, QueueEntry};

/// Errors returned when joining a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Every slot at the provider is taken.
    #[error("queue of provider {provider} is full ({capacity} slots)")]
    Full {
        /// Provider whose queue is full.
        provider: AgentId,
        /// Slot count of the queue.
        capacity: usize,
    },
}

/// One provider's waiting line.
#[derive(Debug, Clone, Default)]
struct ProviderQueue {
    /// Waiting requesters in arrival order.
    entries: Vec<QueueEntry>,
    /// No trade may execute before this time.
    busy_until: f64,
}

impl ProviderQueue {
    /// Lowest slot index not held by any entry.
    fn free_slot(&self) -> usize {
        let mut slot = 0_usize;
        while self.entries.iter().any(|e| e.slot_index == slot) {
            slot = slot.saturating_add(1);
        }
        slot
    }
}

/// All provider queues, keyed by provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderQueues {
    /// Queues by provider handle.
    queues: BTreeMap<AgentId, ProviderQueue>,
}

impl ProviderQueues {
    /// Create an empty set of queues.
    pub const fn new() -> Self {
        Self {
            queues: BTreeMap::new(),
        }
    }

    /// Add `requester` to `provider`'s queue with `capacity` slots and
    /// return its slot index. A requester already waiting keeps its slot.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when all slots are taken.
    pub fn enqueue(
        &mut self,
        provider: AgentId,
        requester: AgentId,
        now: f64,
        capacity: usize,
    ) -> Result<usize, QueueError> {
        let queue = self.queues.entry(provider).or_default();
        if let Some(existing) = queue.entries.iter().find(|e| e.requester == requester) {
            return Ok(existing.slot_index);
        }
        if queue.entries.len() >= capacity {
            return Err(QueueError::Full { provider, capacity });
        }
        let slot_index = queue.free_slot();
        queue.entries.push(QueueEntry {
            requester,
            enqueue_time: now,
            slot_index,
        });
        Ok(slot_index)
    }

    /// Remove `requester` from `provider`'s queue, freeing its slot.
    pub fn remove(&mut self, provider: AgentId, requester: AgentId) -> Option<QueueEntry> {
        let queue = self.queues.get_mut(&provider)?;
        let index = queue.entries.iter().position(|e| e.requester == requester)?;
        Some(queue.entries.remove(index))
    }

    /// Zero-based line position of `requester` at `provider`.
    pub fn position(&self, provider: AgentId, requester: AgentId) -> Option<usize> {
        self.queues
            .get(&provider)?
            .entries
            .iter()
            .position(|e| e.requester == requester)
    }

    /// Whether `requester` is at the front of `provider`'s queue.
    pub fn is_first(&self, provider: AgentId, requester: AgentId) -> bool {
        self.position(provider, requester) == Some(0)
    }

    /// Entries waiting at `provider`, front first.
    pub fn entries(&self, provider: AgentId) -> &[QueueEntry] {
        self.queues
            .get(&provider)
            .map_or(&[], |q| q.entries.as_slice())
    }

    /// Number of requesters waiting at `provider`.
    pub fn len(&self, provider: AgentId) -> usize {
        self.entries(provider).len()
    }

    /// Time until which `provider` may not trade.
    pub fn busy_until(&self, provider: AgentId) -> f64 {
        self.queues.get(&provider).map_or(f64::NEG_INFINITY, |q| q.busy_until)
    }

    /// Block `provider` from trading until `until`.
    pub fn set_busy_until(&mut self, provider: AgentId, until: f64) {
        if until.is_finite() {
            self.queues.entry(provider).or_default().busy_until = until;
        }
    }

    /// Total number of waiting requesters across all providers.
    pub fn total_waiting(&self) -> usize {
        self.queues.values().map(|q| q.entries.len()).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PROVIDER: AgentId = AgentId(0);

    #[test]
    fn capacity_two_admits_first_two_in_order() {
        let mut queues = ProviderQueues::new();
        let (a, b, c) = (AgentId::new(1), AgentId::new(2), AgentId::new(3));
        assert_eq!(queues.enqueue(PROVIDER, a, 1.0, 2), Ok(0));
        assert_eq!(queues.enqueue(PROVIDER, b, 1.0, 2), Ok(1));
        assert_eq!(
            queues.enqueue(PROVIDER, c, 1.0, 2),
            Err(QueueError::Full {
                provider: PROVIDER,
                capacity: 2
            })
        );
        assert!(queues.is_first(PROVIDER, a));
        assert_eq!(queues.position(PROVIDER, b), Some(1));
        assert_eq!(queues.position(PROVIDER, c), None);
    }

    #[test]
    fn freed_slot_goes_to_next_arrival_behind_the_line() {
        let mut queues = ProviderQueues::new();
        let (a, b, c) = (AgentId::new(1), AgentId::new(2), AgentId::new(3));
        queues.enqueue(PROVIDER, a, 1.0, 2).unwrap();
        queues.enqueue(PROVIDER, b, 1.0, 2).unwrap();
        let left = queues.remove(PROVIDER, a).unwrap();
        assert_eq!(left.slot_index, 0);

        // B moves to the front but keeps its slot; C takes the freed one.
        assert!(queues.is_first(PROVIDER, b));
        assert_eq!(queues.enqueue(PROVIDER, c, 2.0, 2), Ok(0));
        assert_eq!(queues.position(PROVIDER, c), Some(1));
    }

    #[test]
    fn rejoining_keeps_the_same_slot() {
        let mut queues = ProviderQueues::new();
        let a = AgentId::new(1);
        assert_eq!(queues.enqueue(PROVIDER, a, 1.0, 1), Ok(0));
        assert_eq!(queues.enqueue(PROVIDER, a, 2.0, 1), Ok(0));
        assert_eq!(queues.len(PROVIDER), 1);
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut queues = ProviderQueues::new();
        assert!(queues.enqueue(PROVIDER, AgentId::new(1), 0.0, 0).is_err());
    }

    #[test]
    fn busy_until_defaults_to_never_busy() {
        let mut queues = ProviderQueues::new();
        assert!(queues.busy_until(PROVIDER) < 0.0);
        queues.set_busy_until(PROVIDER, 5.0);
        assert!((queues.busy_until(PROVIDER) - 5.0).abs() < f64::EPSILON);
    }
}
