//! Agent records and creation.
//!
//! An [`Agent`] bundles everything the negotiation core reads or mutates
//! for one NPC: its ledgers, intents, authored need settings, affinity
//! graph, preference profile, private random stream, and the persisted
//! negotiation state. The [`AgentManager`] hands out sequential handles so
//! agents can live in an index-addressed arena, and enforces unique names.

use std::collections::{BTreeMap, BTreeSet};

use hearth_types::{
    AgentId, AnchorId, IntentId, Need, NeedSetting, ResourceId, SocietyId, TradeRequestState,
};

use crate::error::AgentError;
use crate::intents::IntentQueue;
use crate::inventory::ResourceLedger;
use crate::needs::NeedLedger;
use crate::preference::PreferenceProfile;
use crate::resolve::NeedSettings;
use crate::rng::AgentRng;
use crate::social::{AffinityDefaults, AffinityGraph, resolve_affinity};

/// One simulated NPC.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Arena handle.
    pub id: AgentId,
    /// Unique display name.
    pub name: String,
    /// Agent kind, used for type-level affinity defaults.
    pub kind: String,
    /// Society the agent belongs to.
    pub society: SocietyId,
    /// Needs with their bounds.
    pub needs: NeedLedger,
    /// Resources held.
    pub resources: ResourceLedger,
    /// Pending intents.
    pub intents: IntentQueue,
    /// Authored need settings.
    pub settings: NeedSettings,
    /// Explicit relationships.
    pub affinity: AffinityGraph,
    /// How generous the agent is as a provider.
    pub preference: PreferenceProfile,
    /// Private random stream.
    pub rng: AgentRng,
    /// Persisted negotiation state.
    pub request: TradeRequestState,
    /// Providers excluded from the current search episode.
    pub attempted_providers: Vec<AgentId>,
    /// Intent the exclusion list belongs to.
    pub search_intent: Option<IntentId>,
    /// Anchor where the agent trades as a provider, if fixed.
    pub trade_anchor: Option<AnchorId>,
    /// Anchors where providers were last met.
    pub known_provider_anchors: BTreeMap<AgentId, AnchorId>,
}

impl Agent {
    /// Affinity this agent holds toward `other`.
    pub fn affinity_toward(&self, other: &Self, defaults: &AffinityDefaults) -> f32 {
        resolve_affinity(&self.affinity, defaults, &self.kind, other.id, &other.kind)
    }

    /// Start a provider search for `intent`.
    ///
    /// The exclusion list carries over while the same intent is retried and
    /// is cleared when a different intent starts searching.
    pub fn begin_search(&mut self, intent: IntentId) {
        if self.search_intent != Some(intent) {
            self.attempted_providers.clear();
            self.search_intent = Some(intent);
        }
    }

    /// End the current search episode.
    pub fn end_search(&mut self) {
        self.attempted_providers.clear();
        self.search_intent = None;
    }

    /// Exclude `provider` from the current search episode.
    pub fn exclude_provider(&mut self, provider: AgentId) {
        if !self.attempted_providers.contains(&provider) {
            self.attempted_providers.push(provider);
        }
    }

    /// Whether `provider` is excluded from the current search episode.
    pub fn is_excluded(&self, provider: AgentId) -> bool {
        self.attempted_providers.contains(&provider)
    }

    /// Reset the negotiation state to idle.
    pub fn clear_request(&mut self) {
        self.request = TradeRequestState::default();
    }
}

/// Authoring data for a new agent.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    /// Unique display name.
    pub name: String,
    /// Agent kind.
    pub kind: String,
    /// Society the agent joins.
    pub society: SocietyId,
    /// Initial needs.
    pub needs: Vec<Need>,
    /// Initial resources.
    pub resources: Vec<(ResourceId, f32)>,
    /// Need settings.
    pub settings: Vec<NeedSetting>,
    /// Provider preference profile.
    pub preference: PreferenceProfile,
    /// Fixed trade anchor, if any.
    pub trade_anchor: Option<AnchorId>,
}

impl AgentSpec {
    /// Spec with no needs, resources or settings.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, society: SocietyId) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            society,
            needs: Vec::new(),
            resources: Vec::new(),
            settings: Vec::new(),
            preference: PreferenceProfile::default(),
            trade_anchor: None,
        }
    }
}

/// Creates agents with sequential handles and unique names.
#[derive(Debug)]
pub struct AgentManager {
    /// Names currently in use.
    names_in_use: BTreeSet<String>,
    /// Handle the next agent receives.
    next_id: u32,
    /// World seed from which agent streams derive.
    world_seed: u64,
}

impl AgentManager {
    /// Create a manager whose agents derive their random streams from
    /// `world_seed`.
    pub const fn new(world_seed: u64) -> Self {
        Self {
            names_in_use: BTreeSet::new(),
            next_id: 0,
            world_seed,
        }
    }

    /// Create an agent from `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateName`] if the name is taken,
    /// [`AgentError::DuplicateNeed`] if a need is listed twice, or
    /// [`AgentError::HandlesExhausted`] when no handle is left.
    pub fn create(&mut self, spec: AgentSpec) -> Result<Agent, AgentError> {
        if self.names_in_use.contains(&spec.name) {
            return Err(AgentError::DuplicateName(spec.name));
        }
        let id = AgentId::new(self.next_id);
        let next = self
            .next_id
            .checked_add(1)
            .ok_or(AgentError::HandlesExhausted)?;
        let needs = NeedLedger::from_needs(spec.needs)?;

        self.next_id = next;
        self.names_in_use.insert(spec.name.clone());

        Ok(Agent {
            id,
            name: spec.name,
            kind: spec.kind,
            society: spec.society,
            needs,
            resources: ResourceLedger::from_pairs(spec.resources),
            intents: IntentQueue::new(),
            settings: NeedSettings::from_settings(spec.settings),
            affinity: AffinityGraph::new(),
            preference: spec.preference,
            rng: AgentRng::for_agent(self.world_seed, id),
            request: TradeRequestState::default(),
            attempted_providers: Vec::new(),
            search_intent: None,
            trade_anchor: spec.trade_anchor,
            known_provider_anchors: BTreeMap::new(),
        })
    }

    /// Number of agents created so far.
    pub const fn created(&self) -> u32 {
        self.next_id
    }

    /// Whether `name` is taken.
    pub fn name_in_use(&self, name: &str) -> bool {
        self.names_in_use.contains(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_types::NeedId;

    use super::*;

    fn spec(name: &str) -> AgentSpec {
        AgentSpec {
            needs: vec![Need::new(NeedId::from("thirst"), 0.2, 0.0, 1.0)],
            resources: vec![(ResourceId::from("water"), 3.0)],
            ..AgentSpec::new(name, "villager", SocietyId::new(0))
        }
    }

    #[test]
    fn handles_are_sequential() {
        let mut manager = AgentManager::new(1);
        let a = manager.create(spec("Ada")).unwrap();
        let b = manager.create(spec("Bo")).unwrap();
        assert_eq!(a.id, AgentId::new(0));
        assert_eq!(b.id, AgentId::new(1));
        assert_eq!(manager.created(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut manager = AgentManager::new(1);
        manager.create(spec("Ada")).unwrap();
        let result = manager.create(spec("Ada"));
        assert!(matches!(result, Err(AgentError::DuplicateName(_))));
        assert_eq!(manager.created(), 1);
    }

    #[test]
    fn new_agent_is_idle_with_inventory() {
        let mut manager = AgentManager::new(1);
        let agent = manager.create(spec("Ada")).unwrap();
        assert!(agent.request.is_idle());
        assert!(agent.resources.has_positive(&ResourceId::from("water")));
        assert!(agent.intents.is_empty());
    }

    #[test]
    fn exclusion_list_survives_retries_of_same_intent() {
        let mut manager = AgentManager::new(1);
        let mut agent = manager.create(spec("Ada")).unwrap();
        agent.begin_search(IntentId::new(0));
        agent.exclude_provider(AgentId::new(5));
        agent.begin_search(IntentId::new(0));
        assert!(agent.is_excluded(AgentId::new(5)));
        agent.begin_search(IntentId::new(1));
        assert!(!agent.is_excluded(AgentId::new(5)));
    }
}
