//! The mutable simulation state and the collaborators a tick talks to.
//!
//! [`SimulationState`] owns everything the negotiation core mutates: the
//! clock, societies, the agent arena, provider queues and locks, and the
//! transfer ledger. [`Collaborators`] bundles the external interfaces the
//! core only calls into (navigation, schedule, telemetry, signals).

use hearth_agents::{
    AffinityDefaults, AgentError, AgentManager, AgentSpec, TradeOutcome, TradePolicy,
};
use hearth_events::{SignalSink, Telemetry, TradeEvent};
use hearth_ledger::Ledger;
use hearth_types::{
    AgentId, AnchorId, EventKind, NeedId, ResourceId, SocietyId, TradeFailReason,
};
use hearth_world::{AnchorRegistry, Navigation, Position, Schedule, WorldError};
use tracing::{debug, warn};

use crate::arena::{AgentArena, ArenaError};
use crate::clock::{ClockError, WorldClock};
use crate::config::{ConfigError, SimulationConfig};
use crate::providers::ProviderLocks;
use crate::queue::ProviderQueues;
use crate::society::{Society, SocietyError, SocietyRegistry};

/// Errors that can occur while assembling the simulation state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The configuration is invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The clock could not be built.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A society could not be registered.
    #[error("society error: {source}")]
    Society {
        /// The underlying society error.
        #[from]
        source: SocietyError,
    },

    /// An agent could not be created.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },

    /// An agent could not be stored.
    #[error("arena error: {source}")]
    Arena {
        /// The underlying arena error.
        #[from]
        source: ArenaError,
    },

    /// An anchor could not be registered.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

/// External interfaces consumed by the tick.
pub struct Collaborators<'a> {
    /// Movement and positions.
    pub navigation: &'a mut dyn Navigation,
    /// Activity windows and schedule overrides.
    pub schedule: &'a mut dyn Schedule,
    /// Structured event sink.
    pub telemetry: &'a mut dyn Telemetry,
    /// Outcome signal sink.
    pub signals: &'a mut dyn SignalSink,
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    /// The world clock.
    pub clock: WorldClock,
    /// All societies.
    pub societies: SocietyRegistry,
    /// All agents, indexed by handle.
    pub agents: AgentArena,
    /// Issues agent handles and random streams.
    pub manager: AgentManager,
    /// Meeting points and their queue slots.
    pub anchors: AnchorRegistry,
    /// Per-provider waiting lines.
    pub queues: ProviderQueues,
    /// Providers claimed during the current tick.
    pub locks: ProviderLocks,
    /// Audit trail of realized transfers.
    pub ledger: Ledger,
    /// Negotiation tunables.
    pub policy: TradePolicy,
    /// Kind-level affinity fallbacks.
    pub affinity_defaults: AffinityDefaults,
    /// Flat need growth per simulated hour (0 disables decay).
    pub need_decay_per_hour: f32,
    /// Ticks of ledger history kept after each audit (0 = keep all).
    pub ledger_retention_ticks: u64,
}

impl SimulationState {
    /// Create an empty state around `clock`.
    pub fn new(clock: WorldClock, policy: TradePolicy, world_seed: u64) -> Self {
        Self {
            clock,
            societies: SocietyRegistry::new(),
            agents: AgentArena::new(),
            manager: AgentManager::new(world_seed),
            anchors: AnchorRegistry::new(),
            queues: ProviderQueues::new(),
            locks: ProviderLocks::new(),
            ledger: Ledger::new(),
            policy,
            affinity_defaults: AffinityDefaults::new(),
            need_decay_per_hour: 0.0,
            ledger_retention_ticks: 0,
        }
    }

    /// Build a state from configuration: validated policy, clock and the
    /// configured societies with their pools. Agents and anchors are added
    /// by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the configuration is invalid or a society
    /// cannot be registered.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, StateError> {
        config.validate()?;
        let clock = WorldClock::new(&config.time)?;
        let mut state = Self::new(clock, config.trade.clone(), config.world.seed);
        state.need_decay_per_hour = config.population.need_decay_per_hour.max(0.0);
        state.ledger_retention_ticks = config.simulation.ledger_retention_ticks;

        for society_config in &config.societies {
            let rate = society_config
                .trade_tick_rate
                .unwrap_or(config.trade.default_trade_tick_rate);
            let id = state.add_society(&society_config.name, rate)?;
            let society = state.societies.require_mut(id)?;
            society.set_time_scale(society_config.time_scale);
            for (resource, amount) in &society_config.pool {
                society.pool.add(&ResourceId::from(resource.as_str()), *amount);
            }
        }
        Ok(state)
    }

    /// Register a society whose local time starts at the clock's time.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Society`] for a duplicate name.
    pub fn add_society(&mut self, name: &str, trade_tick_rate: f32) -> Result<SocietyId, StateError> {
        Ok(self
            .societies
            .add(name, trade_tick_rate, self.clock.now())?)
    }

    /// Register an anchor.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::World`] for a duplicate name or bad position.
    pub fn add_anchor(
        &mut self,
        name: &str,
        position: Position,
        queue_slots: Vec<Position>,
        trade_anywhere: bool,
    ) -> Result<AnchorId, StateError> {
        Ok(self
            .anchors
            .add(name, position, queue_slots, trade_anywhere)?)
    }

    /// Create an agent from `spec` and store it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Society`] if the spec names an unknown society,
    /// or [`StateError::Agent`] if the agent cannot be created.
    pub fn spawn_agent(&mut self, spec: AgentSpec) -> Result<AgentId, StateError> {
        if self.societies.get(spec.society).is_none() {
            return Err(SocietyError::NotFound(spec.society).into());
        }
        let agent = self.manager.create(spec)?;
        debug!(agent = %agent.id, name = %agent.name, society = %agent.society, "Agent spawned");
        Ok(self.agents.insert(agent)?)
    }

    /// Local hours covered by the last tick in `society` (the world clock's
    /// tick length for unknown societies).
    pub fn delta_simulated_hours(&self, society: SocietyId) -> f64 {
        self.societies
            .get(society)
            .map_or(self.clock.hours_per_tick(), Society::delta_simulated_hours)
    }

    /// Local simulated time of `society` (world time for unknown ones).
    pub fn current_simulated_time(&self, society: SocietyId) -> f64 {
        self.societies
            .get(society)
            .map_or(self.clock.now(), Society::current_simulated_time)
    }

    /// Run an immediate rule-triggered trade of up to `amount` units of
    /// `resource` from `provider` to `requester`.
    ///
    /// Bypasses travel and queueing but honours the provider lock and busy
    /// window. Both agents' affinity toward each other moves by the
    /// policy's ambient success or failure delta.
    ///
    /// # Errors
    ///
    /// Returns [`TradeFailReason::ProviderMissing`] for unknown or identical
    /// agents, [`TradeFailReason::ProviderBusy`] when the provider is
    /// claimed or busy, and [`TradeFailReason::NoResource`] when the
    /// requester has no use for the resource.
    pub fn ambient_trade(
        &mut self,
        telemetry: &mut dyn Telemetry,
        requester: AgentId,
        provider: AgentId,
        resource: &ResourceId,
        amount: f32,
    ) -> Result<TradeOutcome, TradeFailReason> {
        let tick = self.clock.tick();
        let society = self
            .agents
            .get(requester)
            .map(|a| a.society)
            .ok_or(TradeFailReason::ProviderMissing)?;
        let now = self.current_simulated_time(society);

        let (req, prov) = self
            .agents
            .pair_mut(requester, provider)
            .ok_or(TradeFailReason::ProviderMissing)?;
        let resolved = req
            .settings
            .resolve(&NeedId::empty(), resource)
            .ok_or(TradeFailReason::NoResource)?;
        if now < self.queues.busy_until(provider) || !self.locks.lock(provider, requester) {
            return Err(TradeFailReason::ProviderBusy);
        }

        let outcome = hearth_agents::ambient_trade(
            req,
            prov,
            &resolved,
            amount,
            &self.policy,
            &self.affinity_defaults,
            now,
        );

        let mut event = TradeEvent::new(EventKind::AmbientTrade, now, society, requester)
            .with_target(provider)
            .with_ids(&resolved.need_id, &resolved.resource_id)
            .with_value(outcome.amount());
        match outcome {
            TradeOutcome::Success { amount, .. } => {
                record_transfer(
                    &mut self.ledger,
                    tick,
                    &resolved.resource_id,
                    amount,
                    provider,
                    requester,
                    self.policy.consume_on_resolve,
                );
                self.queues
                    .set_busy_until(provider, now + self.policy.trade_duration_hours);
            }
            TradeOutcome::Rejected { .. } => event = event.with_reason(TradeFailReason::Rejected),
            TradeOutcome::NoResource => event = event.with_reason(TradeFailReason::NoResource),
        }
        telemetry.append_event(event);
        Ok(outcome)
    }
}

/// Record a completed trade, plus the requester's consumption when traded
/// goods are consumed on the spot.
pub(crate) fn record_transfer(
    ledger: &mut Ledger,
    tick: u64,
    resource: &ResourceId,
    amount: f32,
    provider: AgentId,
    requester: AgentId,
    consumed: bool,
) {
    if let Err(err) = ledger.record_trade(tick, resource, amount, provider, requester) {
        warn!(tick, %provider, %requester, error = %err, "Trade not recorded");
        return;
    }
    if !consumed {
        return;
    }
    if let Err(err) = ledger.record_consumption(tick, resource, amount, requester) {
        warn!(tick, %requester, error = %err, "Consumption not recorded");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_events::EventLog;
    use hearth_types::{Need, NeedSetting};

    use super::*;

    fn water() -> ResourceId {
        ResourceId::from("water")
    }

    fn thirsty_and_wet() -> (SimulationState, AgentId, AgentId) {
        let clock = WorldClock::from_parts(0, 0.25, 8.0).unwrap();
        let policy = TradePolicy {
            base_acceptance: 1.0,
            ..TradePolicy::default()
        };
        let mut state = SimulationState::new(clock, policy, 7);
        let society = state.add_society("Riverside", 0.0).unwrap();
        let requester = state
            .spawn_agent(AgentSpec {
                needs: vec![Need::new(NeedId::from("thirst"), 0.9, 0.0, 1.0)],
                settings: vec![NeedSetting {
                    need_id: NeedId::from("thirst"),
                    resource_id: water(),
                    min: 0.0,
                    max: 1.0,
                    satisfaction_per_unit: 0.25,
                    request_amount: 2.0,
                    intent_threshold: 0.6,
                }],
                ..AgentSpec::new("Ada", "villager", society)
            })
            .unwrap();
        let provider = state
            .spawn_agent(AgentSpec {
                resources: vec![(water(), 5.0)],
                ..AgentSpec::new("Bo", "villager", society)
            })
            .unwrap();
        (state, requester, provider)
    }

    #[test]
    fn from_config_registers_societies_and_pools() {
        let config = SimulationConfig::default();
        let state = SimulationState::from_config(&config).unwrap();
        assert_eq!(state.societies.len(), 2);
        let riverside = state.societies.get(SocietyId::new(0)).unwrap();
        assert!((riverside.pool.amount(&water()) - 8.0).abs() < f32::EPSILON);
        assert!(state.agents.is_empty());
    }

    #[test]
    fn spawning_into_unknown_society_fails() {
        let clock = WorldClock::from_parts(0, 1.0, 0.0).unwrap();
        let mut state = SimulationState::new(clock, TradePolicy::default(), 1);
        let result = state.spawn_agent(AgentSpec::new("Lost", "villager", SocietyId::new(3)));
        assert!(matches!(result, Err(StateError::Society { .. })));
    }

    #[test]
    fn ambient_trade_moves_goods_and_affinity() {
        let (mut state, requester, provider) = thirsty_and_wet();
        let mut log = EventLog::new(8);
        let outcome = state
            .ambient_trade(&mut log, requester, provider, &water(), 2.0)
            .unwrap();
        assert!(outcome.is_success());
        assert!((state.agents.get(provider).unwrap().resources.amount(&water()) - 3.0).abs() < 1e-5);

        let success_delta = state.policy.ambient_success_delta;
        let toward_provider = state.agents.get(requester).unwrap().affinity.get(provider);
        let toward_requester = state.agents.get(provider).unwrap().affinity.get(requester);
        assert!((toward_provider.unwrap() - success_delta).abs() < 1e-6);
        assert!((toward_requester.unwrap() - success_delta).abs() < 1e-6);

        assert_eq!(log.count(EventKind::AmbientTrade), 1);
        assert_eq!(state.ledger.len(), 2);
        assert!(state.ledger.verify_conservation(0).is_balanced());
    }

    #[test]
    fn ambient_trade_respects_provider_lock() {
        let (mut state, requester, provider) = thirsty_and_wet();
        assert!(state.locks.lock(provider, AgentId::new(40)));
        let mut log = EventLog::new(8);
        assert_eq!(
            state.ambient_trade(&mut log, requester, provider, &water(), 1.0),
            Err(TradeFailReason::ProviderBusy)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn ambient_trade_with_self_is_rejected() {
        let (mut state, requester, _) = thirsty_and_wet();
        let mut log = EventLog::new(8);
        assert_eq!(
            state.ambient_trade(&mut log, requester, requester, &water(), 1.0),
            Err(TradeFailReason::ProviderMissing)
        );
    }
}
