//! Affinity graph and type-level affinity defaults.
//!
//! Each agent keeps a sparse table of affinity scores toward agents it has
//! an explicit relationship with. Lookups fall back to a table of defaults
//! keyed by the pair of agent kinds, then to neutral (0). Scores are
//! clamped to [-1, 1] on every update.

use std::collections::BTreeMap;

use hearth_types::{AgentId, clamp_finite};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum affinity (full trust).
pub const AFFINITY_MAX: f32 = 1.0;

/// Minimum affinity (full hostility).
pub const AFFINITY_MIN: f32 = -1.0;

/// Affinity toward agents with no recorded or default relationship.
pub const AFFINITY_NEUTRAL: f32 = 0.0;

// ---------------------------------------------------------------------------
// AffinityGraph
// ---------------------------------------------------------------------------

/// Per-agent sparse relationship table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffinityGraph {
    /// Affinity scores keyed by the other agent.
    scores: BTreeMap<AgentId, f32>,
    /// Number of affinity updates recorded per agent.
    interaction_count: BTreeMap<AgentId, u64>,
    /// Simulated time of the most recent update per agent.
    last_interaction: BTreeMap<AgentId, f64>,
}

impl AffinityGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
            interaction_count: BTreeMap::new(),
            last_interaction: BTreeMap::new(),
        }
    }

    /// Explicit affinity toward `other`, if recorded.
    pub fn get(&self, other: AgentId) -> Option<f32> {
        self.scores.get(&other).copied()
    }

    /// Record an explicit affinity, clamped to [-1, 1].
    pub fn set(&mut self, other: AgentId, score: f32) {
        self.scores
            .insert(other, clamp_finite(score, AFFINITY_MIN, AFFINITY_MAX));
    }

    /// Shift the affinity toward `other` by `delta`, starting from `base`
    /// when no explicit score exists yet.
    ///
    /// Returns the old and the new clamped score.
    pub fn apply_delta(&mut self, other: AgentId, base: f32, delta: f32, now: f64) -> (f32, f32) {
        let old = self.get(other).unwrap_or(base);
        let delta = if delta.is_finite() { delta } else { 0.0 };
        let new = clamp_finite(old + delta, AFFINITY_MIN, AFFINITY_MAX);
        self.scores.insert(other, new);

        let count = self.interaction_count.entry(other).or_insert(0);
        *count = count.saturating_add(1);
        self.last_interaction.insert(other, now);

        (old, new)
    }

    /// Number of affinity updates recorded toward `other`.
    pub fn interaction_count(&self, other: AgentId) -> u64 {
        self.interaction_count.get(&other).copied().unwrap_or(0)
    }

    /// Simulated time of the last affinity update toward `other`.
    pub fn last_interaction(&self, other: AgentId) -> Option<f64> {
        self.last_interaction.get(&other).copied()
    }

    /// Agents with an explicit score, in handle order.
    pub fn known_agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.scores.keys().copied()
    }
}

// ---------------------------------------------------------------------------
// AffinityDefaults
// ---------------------------------------------------------------------------

/// Type-level fallback affinities keyed by `(from_kind, to_kind)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AffinityDefaults {
    /// Default score per ordered pair of agent kinds.
    table: BTreeMap<(String, String), f32>,
}

impl AffinityDefaults {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Set the default affinity agents of `from_kind` hold toward agents of
    /// `to_kind`.
    pub fn insert(&mut self, from_kind: &str, to_kind: &str, score: f32) {
        self.table.insert(
            (from_kind.to_owned(), to_kind.to_owned()),
            clamp_finite(score, AFFINITY_MIN, AFFINITY_MAX),
        );
    }

    /// Default affinity for an ordered kind pair, if authored.
    pub fn get(&self, from_kind: &str, to_kind: &str) -> Option<f32> {
        self.table
            .get(&(from_kind.to_owned(), to_kind.to_owned()))
            .copied()
    }
}

/// Resolve the affinity an agent of `from_kind` with graph `graph` holds
/// toward `to`: explicit score, then kind default, then neutral.
pub fn resolve_affinity(
    graph: &AffinityGraph,
    defaults: &AffinityDefaults,
    from_kind: &str,
    to: AgentId,
    to_kind: &str,
) -> f32 {
    graph
        .get(to)
        .or_else(|| defaults.get(from_kind, to_kind))
        .unwrap_or(AFFINITY_NEUTRAL)
}

/// Human-readable label for an affinity score.
pub fn affinity_label(score: f32) -> &'static str {
    if score >= 0.7 {
        "close"
    } else if score >= 0.3 {
        "friendly"
    } else if score > -0.3 {
        "neutral"
    } else if score > -0.7 {
        "wary"
    } else {
        "hostile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_score_wins_over_default() {
        let mut graph = AffinityGraph::new();
        let mut defaults = AffinityDefaults::new();
        defaults.insert("farmer", "baker", 0.3);
        graph.set(AgentId::new(2), -0.4);
        let score = resolve_affinity(&graph, &defaults, "farmer", AgentId::new(2), "baker");
        assert!((score + 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn falls_back_to_kind_default_then_neutral() {
        let graph = AffinityGraph::new();
        let mut defaults = AffinityDefaults::new();
        defaults.insert("farmer", "baker", 0.3);
        let by_kind = resolve_affinity(&graph, &defaults, "farmer", AgentId::new(2), "baker");
        assert!((by_kind - 0.3).abs() < f32::EPSILON);
        let neutral = resolve_affinity(&graph, &defaults, "baker", AgentId::new(2), "farmer");
        assert!(neutral.abs() < f32::EPSILON);
    }

    #[test]
    fn apply_delta_clamps_and_counts() {
        let mut graph = AffinityGraph::new();
        let other = AgentId::new(7);
        let (old, new) = graph.apply_delta(other, 0.95, 0.1, 3.0);
        assert!((old - 0.95).abs() < f32::EPSILON);
        assert!((new - 1.0).abs() < f32::EPSILON);
        graph.apply_delta(other, 0.0, -5.0, 4.0);
        assert!((graph.get(other).unwrap_or(0.0) + 1.0).abs() < f32::EPSILON);
        assert_eq!(graph.interaction_count(other), 2);
        assert_eq!(graph.last_interaction(other), Some(4.0));
    }

    #[test]
    fn set_clamps_out_of_range() {
        let mut graph = AffinityGraph::new();
        graph.set(AgentId::new(1), 3.0);
        assert_eq!(graph.get(AgentId::new(1)), Some(1.0));
    }

    #[test]
    fn labels_cover_range() {
        assert_eq!(affinity_label(0.9), "close");
        assert_eq!(affinity_label(0.0), "neutral");
        assert_eq!(affinity_label(-0.9), "hostile");
    }
}
