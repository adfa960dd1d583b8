//! Provider candidates, affinity ranking, anchor resolution and the
//! per-tick provider lock set.
//!
//! The candidate list is rebuilt once per tick from every agent that holds
//! any positive resource. Ranking then filters it per requester: same
//! society, not the requester itself, not excluded in the current search,
//! and holding the wanted resource right now. Among the qualifying
//! candidates the one the requester likes most wins; ties keep the first.

use std::collections::BTreeMap;

use hearth_agents::{AffinityDefaults, Agent, TradePolicy};
use hearth_types::{AgentId, AnchorId, ResourceId, SocietyId, TradeFailReason};
use hearth_world::{AnchorRegistry, Schedule};
use tracing::trace;

use crate::arena::AgentArena;

/// An agent that may act as a provider this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// The candidate agent.
    pub agent: AgentId,
    /// Its society.
    pub society: SocietyId,
}

/// Collect every agent holding any positive resource, in handle order.
pub fn build_candidates(arena: &AgentArena) -> Vec<Candidate> {
    arena
        .iter()
        .filter(|a| a.resources.has_any_positive())
        .map(|a| Candidate {
            agent: a.id,
            society: a.society,
        })
        .collect()
}

/// Pick the qualifying candidate with the highest affinity from
/// `requester`. Returns the provider and that affinity.
pub fn rank_providers(
    requester: &Agent,
    resource: &ResourceId,
    candidates: &[Candidate],
    arena: &AgentArena,
    defaults: &AffinityDefaults,
) -> Option<(AgentId, f32)> {
    let mut best: Option<(AgentId, f32)> = None;
    for candidate in candidates {
        if candidate.agent == requester.id
            || candidate.society != requester.society
            || requester.is_excluded(candidate.agent)
        {
            continue;
        }
        let Some(provider) = arena.get(candidate.agent) else {
            continue;
        };
        if !provider.resources.has_positive(resource) {
            continue;
        }
        let affinity = requester.affinity_toward(provider, defaults);
        trace!(
            requester = %requester.id,
            candidate = %provider.id,
            affinity,
            "Ranking candidate"
        );
        match best {
            Some((_, best_affinity)) if affinity <= best_affinity => {}
            _ => best = Some((provider.id, affinity)),
        }
    }
    best
}

/// Where `requester` should meet `provider`: a remembered anchor first,
/// then the provider's fixed trade anchor, then its scheduled one. Anchors
/// missing from the registry do not count.
pub fn resolve_anchor(
    requester: &Agent,
    provider: &Agent,
    schedule: &dyn Schedule,
    anchors: &AnchorRegistry,
    now: f64,
) -> Option<AnchorId> {
    requester
        .known_provider_anchors
        .get(&provider.id)
        .copied()
        .filter(|id| anchors.get(*id).is_some())
        .or_else(|| provider.trade_anchor.filter(|id| anchors.get(*id).is_some()))
        .or_else(|| {
            schedule
                .trade_anchor(provider.id, now)
                .filter(|id| anchors.get(*id).is_some())
        })
}

/// Providers claimed by a requester during the current tick.
#[derive(Debug, Clone, Default)]
pub struct ProviderLocks {
    /// Provider to the requester holding it.
    holders: BTreeMap<AgentId, AgentId>,
}

impl ProviderLocks {
    /// Create an empty lock set.
    pub const fn new() -> Self {
        Self {
            holders: BTreeMap::new(),
        }
    }

    /// Claim `provider` for `requester`. Succeeds if it is free or already
    /// held by the same requester.
    pub fn lock(&mut self, provider: AgentId, requester: AgentId) -> bool {
        match self.holders.get(&provider) {
            Some(holder) => *holder == requester,
            None => {
                self.holders.insert(provider, requester);
                true
            }
        }
    }

    /// Whether `provider` is held by someone other than `requester`.
    pub fn is_locked_by_other(&self, provider: AgentId, requester: AgentId) -> bool {
        self.holders.get(&provider).is_some_and(|h| *h != requester)
    }

    /// Requester holding `provider`, if any.
    pub fn holder(&self, provider: AgentId) -> Option<AgentId> {
        self.holders.get(&provider).copied()
    }

    /// Release every lock. Called at the end of each tick.
    pub fn clear(&mut self) {
        self.holders.clear();
    }

    /// Number of locked providers.
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Whether no provider is locked.
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

/// A provider chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// The chosen provider.
    pub provider: AgentId,
    /// Where to meet it.
    pub anchor: AnchorId,
    /// Requester's affinity toward the provider.
    pub affinity: f32,
}

/// Read-only world view used by [`select_provider`].
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    /// All agents.
    pub arena: &'a AgentArena,
    /// Registered anchors.
    pub anchors: &'a AnchorRegistry,
    /// Locks taken so far this tick.
    pub locks: &'a ProviderLocks,
    /// Kind-level affinity fallbacks.
    pub defaults: &'a AffinityDefaults,
    /// Protocol tunables.
    pub policy: &'a TradePolicy,
    /// This tick's candidate list.
    pub candidates: &'a [Candidate],
    /// Schedule collaborator.
    pub schedule: &'a dyn Schedule,
}

/// Search a provider for `requester`.
///
/// Candidates without a resolvable anchor are returned in `unreachable` so
/// the caller can add them to the requester's exclusion list; the search
/// retries ranking without them up to `max_provider_attempts_per_tick`
/// times. A winner held by another requester this tick fails fast with
/// [`TradeFailReason::ProviderBusy`].
pub fn select_provider(
    ctx: &SelectionContext<'_>,
    requester: &Agent,
    resource: &ResourceId,
    now: f64,
    unreachable: &mut Vec<AgentId>,
) -> Result<Selection, TradeFailReason> {
    let mut attempts = 0_u32;
    while attempts < ctx.policy.max_provider_attempts_per_tick {
        attempts = attempts.saturating_add(1);

        let ranked = rank_excluding(ctx, requester, resource, unreachable);
        let Some((provider_id, affinity)) = ranked else {
            return Err(TradeFailReason::NoPartner);
        };
        let Some(provider) = ctx.arena.get(provider_id) else {
            return Err(TradeFailReason::ProviderMissing);
        };

        match resolve_anchor(requester, provider, ctx.schedule, ctx.anchors, now) {
            Some(anchor) => {
                if ctx.locks.is_locked_by_other(provider_id, requester.id) {
                    return Err(TradeFailReason::ProviderBusy);
                }
                return Ok(Selection {
                    provider: provider_id,
                    anchor,
                    affinity,
                });
            }
            None => {
                trace!(
                    requester = %requester.id,
                    provider = %provider_id,
                    "Candidate has no reachable anchor"
                );
                unreachable.push(provider_id);
            }
        }
    }
    Err(TradeFailReason::NoPartner)
}

/// Rank with the requester's exclusions plus the candidates found
/// unreachable earlier in this search.
fn rank_excluding(
    ctx: &SelectionContext<'_>,
    requester: &Agent,
    resource: &ResourceId,
    unreachable: &[AgentId],
) -> Option<(AgentId, f32)> {
    if unreachable.is_empty() {
        return rank_providers(requester, resource, ctx.candidates, ctx.arena, ctx.defaults);
    }
    let filtered: Vec<Candidate> = ctx
        .candidates
        .iter()
        .filter(|c| !unreachable.contains(&c.agent))
        .copied()
        .collect();
    rank_providers(requester, resource, &filtered, ctx.arena, ctx.defaults)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_agents::{AgentManager, AgentSpec};
    use hearth_world::{ActivityWindow, FixedSchedule, Position};

    use super::*;

    fn water() -> ResourceId {
        ResourceId::from("water")
    }

    fn spawn(
        manager: &mut AgentManager,
        arena: &mut AgentArena,
        name: &str,
        society: u32,
        water_amount: f32,
        anchor: Option<AnchorId>,
    ) -> AgentId {
        let spec = AgentSpec {
            resources: vec![(water(), water_amount)],
            trade_anchor: anchor,
            ..AgentSpec::new(name, "villager", SocietyId::new(society))
        };
        arena.insert(manager.create(spec).unwrap()).unwrap()
    }

    struct World {
        arena: AgentArena,
        anchors: AnchorRegistry,
        well: AnchorId,
        requester: AgentId,
    }

    fn world() -> World {
        let mut manager = AgentManager::new(3);
        let mut arena = AgentArena::new();
        let mut anchors = AnchorRegistry::new();
        let well = anchors.add("well", Position::new(0.0, 0.0), Vec::new(), false).unwrap();
        let requester = spawn(&mut manager, &mut arena, "req", 0, 0.0, None);
        World {
            arena,
            anchors,
            well,
            requester,
        }
    }

    #[test]
    fn candidates_are_agents_with_any_stock() {
        let mut w = world();
        let mut manager = AgentManager::new(3);
        // Skip the handle already used by the requester.
        let _ = manager.create(AgentSpec::new("req", "villager", SocietyId::new(0)));
        spawn(&mut manager, &mut w.arena, "dry", 0, 0.0, None);
        let wet = spawn(&mut manager, &mut w.arena, "wet", 1, 3.0, None);
        let candidates = build_candidates(&w.arena);
        assert_eq!(
            candidates,
            vec![Candidate {
                agent: wet,
                society: SocietyId::new(1)
            }]
        );
    }

    #[test]
    fn ranking_prefers_affinity_then_first_seen() {
        let mut w = world();
        let mut manager = AgentManager::new(3);
        let _ = manager.create(AgentSpec::new("req", "villager", SocietyId::new(0)));
        let first = spawn(&mut manager, &mut w.arena, "first", 0, 1.0, Some(w.well));
        let second = spawn(&mut manager, &mut w.arena, "second", 0, 1.0, Some(w.well));
        let liked = spawn(&mut manager, &mut w.arena, "liked", 0, 1.0, Some(w.well));
        let foreign = spawn(&mut manager, &mut w.arena, "foreign", 1, 9.0, Some(w.well));
        let candidates = build_candidates(&w.arena);
        let defaults = AffinityDefaults::new();

        // All neutral: first encountered wins.
        let requester = w.arena.get(w.requester).unwrap().clone();
        let ranked = rank_providers(&requester, &water(), &candidates, &w.arena, &defaults);
        assert_eq!(ranked.map(|r| r.0), Some(first));

        // Explicit affinity beats order; other societies never qualify.
        let requester = w.arena.get_mut(w.requester).unwrap();
        requester.affinity.set(liked, 0.6);
        requester.affinity.set(foreign, 1.0);
        requester.exclude_provider(first);
        let requester = requester.clone();
        let ranked = rank_providers(&requester, &water(), &candidates, &w.arena, &defaults);
        assert_eq!(ranked, Some((liked, 0.6)));
        assert_ne!(ranked.map(|r| r.0), Some(second));
    }

    #[test]
    fn unreachable_candidates_are_skipped_up_to_the_cap() {
        let mut w = world();
        let mut manager = AgentManager::new(3);
        let _ = manager.create(AgentSpec::new("req", "villager", SocietyId::new(0)));
        let nowhere = spawn(&mut manager, &mut w.arena, "nowhere", 0, 1.0, None);
        let reachable = spawn(&mut manager, &mut w.arena, "reachable", 0, 1.0, Some(w.well));
        let candidates = build_candidates(&w.arena);
        let defaults = AffinityDefaults::new();
        let policy = TradePolicy::default();
        let locks = ProviderLocks::new();
        let schedule = FixedSchedule::new();
        let ctx = SelectionContext {
            arena: &w.arena,
            anchors: &w.anchors,
            locks: &locks,
            defaults: &defaults,
            policy: &policy,
            candidates: &candidates,
            schedule: &schedule,
        };
        let requester = w.arena.get(w.requester).unwrap();
        let mut unreachable = Vec::new();
        let selection = select_provider(&ctx, requester, &water(), 8.0, &mut unreachable).unwrap();
        assert_eq!(selection.provider, reachable);
        assert_eq!(selection.anchor, w.well);
        assert_eq!(unreachable, vec![nowhere]);

        let capped = TradePolicy {
            max_provider_attempts_per_tick: 1,
            ..TradePolicy::default()
        };
        let ctx = SelectionContext {
            policy: &capped,
            ..ctx
        };
        let mut unreachable = Vec::new();
        assert_eq!(
            select_provider(&ctx, requester, &water(), 8.0, &mut unreachable),
            Err(TradeFailReason::NoPartner)
        );
    }

    #[test]
    fn scheduled_anchor_is_used_when_no_fixed_anchor() {
        let mut w = world();
        let mut manager = AgentManager::new(3);
        let _ = manager.create(AgentSpec::new("req", "villager", SocietyId::new(0)));
        let stall = w.anchors.add("stall", Position::new(4.0, 0.0), Vec::new(), false).unwrap();
        let provider = spawn(&mut manager, &mut w.arena, "vendor", 0, 1.0, None);
        let mut schedule = FixedSchedule::new();
        schedule
            .add_window(
                provider,
                ActivityWindow {
                    start_hour: 8.0,
                    end_hour: 12.0,
                    anchor: Some(stall),
                    trade_capable: true,
                },
            )
            .unwrap();
        let requester = w.arena.get(w.requester).unwrap();
        let vendor = w.arena.get(provider).unwrap();
        assert_eq!(resolve_anchor(requester, vendor, &schedule, &w.anchors, 9.0), Some(stall));
        assert_eq!(resolve_anchor(requester, vendor, &schedule, &w.anchors, 13.0), None);
    }

    #[test]
    fn locked_winner_fails_fast() {
        let mut w = world();
        let mut manager = AgentManager::new(3);
        let _ = manager.create(AgentSpec::new("req", "villager", SocietyId::new(0)));
        let provider = spawn(&mut manager, &mut w.arena, "vendor", 0, 1.0, Some(w.well));
        let candidates = build_candidates(&w.arena);
        let defaults = AffinityDefaults::new();
        let policy = TradePolicy::default();
        let mut locks = ProviderLocks::new();
        assert!(locks.lock(provider, AgentId::new(99)));
        assert!(!locks.lock(provider, w.requester));
        let schedule = FixedSchedule::new();
        let ctx = SelectionContext {
            arena: &w.arena,
            anchors: &w.anchors,
            locks: &locks,
            defaults: &defaults,
            policy: &policy,
            candidates: &candidates,
            schedule: &schedule,
        };
        let requester = w.arena.get(w.requester).unwrap();
        let mut unreachable = Vec::new();
        assert_eq!(
            select_provider(&ctx, requester, &water(), 8.0, &mut unreachable),
            Err(TradeFailReason::ProviderBusy)
        );
    }
}
