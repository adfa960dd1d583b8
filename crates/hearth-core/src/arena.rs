//! Agent arena: every [`Agent`] stored by handle index.
//!
//! Cross references between requesters, providers, queues and anchors are
//! plain handles resolved through this arena. [`AgentArena::pair_mut`]
//! hands out two disjoint mutable borrows for trade execution.

use hearth_agents::Agent;
use hearth_types::AgentId;

/// Errors that can occur when inserting into the arena.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// The agent's handle does not match the next free slot.
    #[error("agent {got} inserted out of order, expected {expected}")]
    OutOfOrder {
        /// Handle the arena expected next.
        expected: AgentId,
        /// Handle that was inserted.
        got: AgentId,
    },
}

/// Dense storage of agents where slot `i` holds `AgentId(i)`.
#[derive(Debug, Clone, Default)]
pub struct AgentArena {
    /// Agents in handle order.
    agents: Vec<Agent>,
}

impl AgentArena {
    /// Create an empty arena.
    pub const fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Append an agent. Handles must arrive in sequence, as issued by
    /// [`hearth_agents::AgentManager`].
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::OutOfOrder`] if the handle is not the next slot.
    pub fn insert(&mut self, agent: Agent) -> Result<AgentId, ArenaError> {
        let expected = AgentId::new(u32::try_from(self.agents.len()).unwrap_or(u32::MAX));
        if agent.id != expected {
            return Err(ArenaError::OutOfOrder {
                expected,
                got: agent.id,
            });
        }
        let id = agent.id;
        self.agents.push(agent);
        Ok(id)
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.index())
    }

    /// Borrow two distinct agents mutably. Returns `None` if the handles
    /// are equal or either is unknown.
    pub fn pair_mut(&mut self, first: AgentId, second: AgentId) -> Option<(&mut Agent, &mut Agent)> {
        let (a, b) = (first.index(), second.index());
        if a == b {
            return None;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.agents.split_at_mut_checked(high)?;
        let low_agent = head.get_mut(low)?;
        let high_agent = tail.first_mut()?;
        if a < b {
            Some((low_agent, high_agent))
        } else {
            Some((high_agent, low_agent))
        }
    }

    /// Handles of all agents in order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    /// Iterate over agents in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// Iterate mutably over agents in handle order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_agents::{AgentManager, AgentSpec};
    use hearth_types::SocietyId;

    use super::*;

    fn arena_of(n: u32) -> AgentArena {
        let mut manager = AgentManager::new(1);
        let mut arena = AgentArena::new();
        for i in 0..n {
            let agent = manager
                .create(AgentSpec::new(format!("agent-{i}"), "villager", SocietyId::new(0)))
                .unwrap();
            arena.insert(agent).unwrap();
        }
        arena
    }

    #[test]
    fn pair_mut_returns_requested_order() {
        let mut arena = arena_of(4);
        let (a, b) = arena.pair_mut(AgentId::new(3), AgentId::new(1)).unwrap();
        assert_eq!(a.id, AgentId::new(3));
        assert_eq!(b.id, AgentId::new(1));
        let (a, b) = arena.pair_mut(AgentId::new(0), AgentId::new(2)).unwrap();
        assert_eq!(a.id, AgentId::new(0));
        assert_eq!(b.id, AgentId::new(2));
    }

    #[test]
    fn pair_mut_rejects_same_or_unknown() {
        let mut arena = arena_of(2);
        assert!(arena.pair_mut(AgentId::new(1), AgentId::new(1)).is_none());
        assert!(arena.pair_mut(AgentId::new(0), AgentId::new(9)).is_none());
    }

    #[test]
    fn out_of_order_insert_is_rejected() {
        let mut manager = AgentManager::new(1);
        let _skipped = manager
            .create(AgentSpec::new("first", "villager", SocietyId::new(0)))
            .unwrap();
        let second = manager
            .create(AgentSpec::new("second", "villager", SocietyId::new(0)))
            .unwrap();
        let mut arena = AgentArena::new();
        assert!(matches!(
            arena.insert(second),
            Err(ArenaError::OutOfOrder { .. })
        ));
    }
}
