//! Navigation collaborator.
//!
//! The negotiation core only needs to point an agent somewhere, ask whether
//! it got there, and read its position. [`Navigation`] captures that
//! contract; [`StepNavigator`] is a straight-line implementation that moves
//! every agent toward its destination at a fixed speed when stepped.

use std::collections::BTreeMap;

use hearth_types::AgentId;

use crate::anchor::Position;

/// Movement interface consumed by the negotiation core.
pub trait Navigation {
    /// Route `agent` toward `target`.
    fn set_destination(&mut self, agent: AgentId, target: Position);

    /// Whether `agent` has reached its current destination.
    fn has_arrived(&self, agent: AgentId) -> bool;

    /// Stop routing `agent`.
    fn clear_destination(&mut self, agent: AgentId);

    /// Current position of `agent`, if it is known to the navigator.
    fn position(&self, agent: AgentId) -> Option<Position>;

    /// Advance movement by `hours` of simulated time.
    fn step(&mut self, hours: f64) {
        let _ = hours;
    }
}

/// Movement state of one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Walker {
    /// Where the agent is.
    position: Position,
    /// Where it is heading.
    destination: Option<Position>,
}

/// Straight-line navigator with a uniform speed.
#[derive(Debug, Clone)]
pub struct StepNavigator {
    /// Distance covered per simulated hour.
    speed_per_hour: f32,
    /// Distance at which a destination counts as reached.
    arrival_radius: f32,
    /// Per-agent movement state.
    walkers: BTreeMap<AgentId, Walker>,
}

impl StepNavigator {
    /// Create a navigator. Negative values are treated as zero.
    pub fn new(speed_per_hour: f32, arrival_radius: f32) -> Self {
        Self {
            speed_per_hour: speed_per_hour.max(0.0),
            arrival_radius: arrival_radius.max(0.0),
            walkers: BTreeMap::new(),
        }
    }

    /// Place `agent` at `position`, dropping any destination.
    pub fn place(&mut self, agent: AgentId, position: Position) {
        self.walkers.insert(
            agent,
            Walker {
                position,
                destination: None,
            },
        );
    }

    /// Current destination of `agent`.
    pub fn destination(&self, agent: AgentId) -> Option<Position> {
        self.walkers.get(&agent).and_then(|w| w.destination)
    }
}

impl Navigation for StepNavigator {
    fn set_destination(&mut self, agent: AgentId, target: Position) {
        if let Some(walker) = self.walkers.get_mut(&agent) {
            walker.destination = Some(target);
        }
    }

    fn has_arrived(&self, agent: AgentId) -> bool {
        self.walkers.get(&agent).is_some_and(|w| {
            w.destination
                .is_some_and(|d| w.position.distance(d) <= self.arrival_radius)
        })
    }

    fn clear_destination(&mut self, agent: AgentId) {
        if let Some(walker) = self.walkers.get_mut(&agent) {
            walker.destination = None;
        }
    }

    fn position(&self, agent: AgentId) -> Option<Position> {
        self.walkers.get(&agent).map(|w| w.position)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn step(&mut self, hours: f64) {
        if !hours.is_finite() || hours <= 0.0 {
            return;
        }
        let max_step = self.speed_per_hour * hours as f32;
        for walker in self.walkers.values_mut() {
            if let Some(target) = walker.destination {
                walker.position = walker.position.step_toward(target, max_step);
            }
        }
    }
}
