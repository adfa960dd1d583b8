//! The per-requester negotiation state machine.
//!
//! Every requester carries a [`TradeRequestState`] and is advanced exactly
//! once per tick by [`Negotiator::advance`]:
//!
//! ```text
//!   Idle ──select provider──▶ Traveling ──arrive──▶ Queued
//!    ▲                          │   │                  │
//!    │          midway trade ◀──┘   └──queue full──▶ fail
//!    │                                                 │
//!    └──── success / fail / abort ◀── first in line ───┘
//! ```
//!
//! - **Idle**: prune and raise intents, pick the most urgent ready intent,
//!   satisfy what own stock and the society pool can, then search a
//!   provider for the remainder.
//! - **Traveling**: trade midway when close enough to a trade-capable,
//!   unclaimed provider; on arrival join the provider's queue.
//! - **Queued**: the front of the line trades once the provider is free;
//!   everyone else refreshes its slot position until the wait times out.
//!
//! Failures are values ([`TradeFailReason`]), never errors. Attempt-consuming
//! failures go through the intent's backoff; an abort drops the intent and
//! returns the requester to idle, releasing its queue slot.
//!
//! [`TradeRequestState`]: hearth_types::TradeRequestState

use hearth_agents::{
    RetryDecision, TradeOutcome, current_urgency, execute_trade, register_failure,
    satisfy_from_stock,
};
use hearth_events::{Signal, TradeEvent};
use hearth_types::{
    AMOUNT_EPSILON, AgentId, AnchorId, EventKind, IntentId, NeedId, NegotiationStage, ResolvedNeed,
    ResourceId, SocietyId, TradeFailReason, TradeRequestState,
};
use tracing::{debug, trace};

use crate::providers::{Candidate, SelectionContext, select_provider};
use crate::state::{Collaborators, SimulationState, record_transfer};

/// What a single advance did for one requester.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Nothing to pursue this tick.
    Idle,
    /// The selected intent was covered by own stock or the society pool.
    ResolvedLocally {
        /// Units taken from stock and pool together.
        amount: f32,
    },
    /// A provider was selected and travel began.
    Started {
        /// The chosen provider.
        provider: AgentId,
    },
    /// Still traveling or waiting in line.
    Waiting,
    /// A trade completed.
    Traded {
        /// The provider that gave.
        provider: AgentId,
        /// Units moved.
        amount: f32,
    },
    /// The attempt failed; the intent is retried or dropped.
    Failed(TradeFailReason),
    /// The request was abandoned and its intent dropped.
    Aborted(TradeFailReason),
}

/// Advances requesters against one tick's shared state.
pub struct Negotiator<'s, 'c, 'a> {
    /// The simulation being advanced.
    state: &'s mut SimulationState,
    /// External collaborators.
    collab: &'c mut Collaborators<'a>,
    /// This tick's provider candidates.
    candidates: &'s [Candidate],
}

impl<'s, 'c, 'a> Negotiator<'s, 'c, 'a> {
    /// Bind a negotiator to the state, collaborators and candidate list of
    /// the current tick.
    pub const fn new(
        state: &'s mut SimulationState,
        collab: &'c mut Collaborators<'a>,
        candidates: &'s [Candidate],
    ) -> Self {
        Self {
            state,
            collab,
            candidates,
        }
    }

    /// Advance `requester` by one step.
    pub fn advance(&mut self, requester: AgentId) -> StepOutcome {
        let Some(agent) = self.state.agents.get(requester) else {
            return StepOutcome::Idle;
        };
        let society = agent.society;
        let stage = agent.request.stage;
        let now = self.state.current_simulated_time(society);

        self.refresh_intents(requester, society, now);

        match stage {
            NegotiationStage::Idle => self.start(requester, society, now),
            NegotiationStage::Traveling => self.travel(requester, society, now),
            NegotiationStage::Queued => self.wait_in_queue(requester, society, now),
        }
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Raise intents for newly urgent needs and prune stale ones.
    fn refresh_intents(&mut self, id: AgentId, society: SocietyId, now: f64) {
        let keep = self.state.policy.min_urgency_to_keep;
        let Some(agent) = self.state.agents.get_mut(id) else {
            return;
        };

        let raised = agent
            .intents
            .raise_from_needs(&agent.needs, &agent.settings, now);
        for intent in raised.iter().filter_map(|i| agent.intents.get(*i)) {
            debug!(agent = %id, need = %intent.need_id, urgency = intent.urgency, "Intent raised");
            self.collab.telemetry.append_event(
                TradeEvent::new(EventKind::IntentRaised, now, society, id)
                    .with_ids(&intent.need_id, &intent.resource_id)
                    .with_value(intent.urgency),
            );
        }

        let dropped = agent.intents.prune(&agent.needs, &agent.settings, keep);
        for intent in dropped {
            if agent.search_intent == Some(intent.id) {
                agent.end_search();
            }
            self.collab.telemetry.append_event(
                TradeEvent::new(EventKind::IntentDropped, now, society, id)
                    .with_ids(&intent.need_id, &intent.resource_id)
                    .with_reason(TradeFailReason::UrgencyDropped)
                    .with_value(current_urgency(&intent, &agent.needs)),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Idle
    // -----------------------------------------------------------------------

    /// Select an intent, resolve what stock and pool can cover, then search
    /// a provider for the remainder.
    fn start(&mut self, id: AgentId, society: SocietyId, now: f64) -> StepOutcome {
        let keep = self.state.policy.min_urgency_to_keep;
        let Some(agent) = self.state.agents.get_mut(id) else {
            return StepOutcome::Idle;
        };
        let Some(intent) = agent
            .intents
            .select(&agent.needs, now)
            .and_then(|i| agent.intents.get(i))
            .cloned()
        else {
            return StepOutcome::Idle;
        };
        let Some(resolved) = agent.settings.resolve(&intent.need_id, &intent.resource_id) else {
            agent.intents.remove(intent.id);
            return StepOutcome::Idle;
        };

        let local = self.consume_locally(id, society, &intent.need_id, &resolved, intent.desired_amount, now);
        let remaining = intent.desired_amount - local;

        let Some(agent) = self.state.agents.get_mut(id) else {
            return StepOutcome::Idle;
        };
        let urgency = current_urgency(&intent, &agent.needs);
        if remaining <= AMOUNT_EPSILON || urgency <= keep {
            agent.intents.remove(intent.id);
            agent.end_search();
            return StepOutcome::ResolvedLocally { amount: local };
        }
        if let Some(stored) = agent.intents.get_mut(intent.id) {
            stored.desired_amount = remaining;
        }
        agent.begin_search(intent.id);

        self.search(
            id,
            society,
            TradeRequestState {
                stage: NegotiationStage::Traveling,
                intent_id: Some(intent.id),
                need_id: intent.need_id,
                resource_id: resolved.resource_id,
                desired_amount: remaining,
                urgency,
                start_time: now,
                is_override: true,
                ..TradeRequestState::default()
            },
            now,
        )
    }

    /// Satisfy up to `wanted` units from the agent's own stock, then from its
    /// society's pool. Returns the units consumed.
    fn consume_locally(
        &mut self,
        id: AgentId,
        society: SocietyId,
        need_id: &NeedId,
        resolved: &ResolvedNeed,
        wanted: f32,
        now: f64,
    ) -> f32 {
        let state = &mut *self.state;
        let tick = state.clock.tick();
        let Some(agent) = state.agents.get_mut(id) else {
            return 0.0;
        };

        let own = satisfy_from_stock(&mut agent.resources, &mut agent.needs, resolved, wanted);
        if own > AMOUNT_EPSILON {
            if let Err(err) = state.ledger.record_consumption(tick, &resolved.resource_id, own, id) {
                debug!(agent = %id, error = %err, "Local consumption not recorded");
            }
            self.collab.telemetry.append_event(
                TradeEvent::new(EventKind::LocalResolve, now, society, id)
                    .with_ids(need_id, &resolved.resource_id)
                    .with_value(own),
            );
        }

        let rest = wanted - own;
        let pooled = if state.policy.use_society_pool && rest > AMOUNT_EPSILON {
            state.societies.get_mut(society).map_or(0.0, |s| {
                satisfy_from_stock(&mut s.pool, &mut agent.needs, resolved, rest)
            })
        } else {
            0.0
        };
        if pooled > AMOUNT_EPSILON {
            if let Err(err) = state
                .ledger
                .record_pool_draw(tick, &resolved.resource_id, pooled, society)
            {
                debug!(agent = %id, error = %err, "Pool draw not recorded");
            }
            self.collab.telemetry.append_event(
                TradeEvent::new(EventKind::PoolResolve, now, society, id)
                    .with_ids(need_id, &resolved.resource_id)
                    .with_value(pooled),
            );
        }
        own + pooled
    }

    /// Pick a provider for `request` and start traveling to the meeting
    /// anchor.
    fn search(
        &mut self,
        id: AgentId,
        society: SocietyId,
        mut request: TradeRequestState,
        now: f64,
    ) -> StepOutcome {
        let Some(intent_id) = request.intent_id else {
            return StepOutcome::Idle;
        };
        let state = &mut *self.state;
        let mut unreachable = Vec::new();
        let selection = {
            let ctx = SelectionContext {
                arena: &state.agents,
                anchors: &state.anchors,
                locks: &state.locks,
                defaults: &state.affinity_defaults,
                policy: &state.policy,
                candidates: self.candidates,
                schedule: &*self.collab.schedule,
            };
            match state.agents.get(id) {
                Some(requester) => {
                    select_provider(&ctx, requester, &request.resource_id, now, &mut unreachable)
                }
                None => Err(TradeFailReason::ProviderMissing),
            }
        };
        let Some(agent) = state.agents.get_mut(id) else {
            return StepOutcome::Idle;
        };
        for provider in unreachable {
            agent.exclude_provider(provider);
        }

        let selection = match selection {
            Ok(selection) => selection,
            Err(TradeFailReason::ProviderBusy) => {
                // No request state is kept; next tick restarts from `start()`
                // with the intent's already reduced desired amount.
                debug!(agent = %id, "Best provider is busy this tick");
                self.collab.telemetry.append_event(
                    TradeEvent::new(EventKind::TradeFailed, now, society, id)
                        .with_ids(&request.need_id, &request.resource_id)
                        .with_reason(TradeFailReason::ProviderBusy),
                );
                return StepOutcome::Failed(TradeFailReason::ProviderBusy);
            }
            Err(reason) => return self.fail(id, society, intent_id, None, reason, now),
        };

        let Some(anchor_position) = state.anchors.get(selection.anchor).map(|a| a.position) else {
            return self.fail(
                id,
                society,
                intent_id,
                Some(selection.provider),
                TradeFailReason::ProviderMissing,
                now,
            );
        };
        state.locks.lock(selection.provider, id);
        request.provider = Some(selection.provider);
        request.anchor = Some(selection.anchor);
        self.collab.telemetry.append_event(
            TradeEvent::new(EventKind::ProviderSelected, now, society, id)
                .with_target(selection.provider)
                .with_ids(&request.need_id, &request.resource_id)
                .with_value(selection.affinity),
        );
        agent.request = request;
        self.collab.schedule.request_override(id);
        self.collab.navigation.set_destination(id, anchor_position);

        debug!(
            agent = %id,
            provider = %selection.provider,
            anchor = %selection.anchor,
            affinity = selection.affinity,
            "Provider selected"
        );
        StepOutcome::Started {
            provider: selection.provider,
        }
    }

    // -----------------------------------------------------------------------
    // Traveling
    // -----------------------------------------------------------------------

    /// Trade midway if possible, otherwise join the queue on arrival.
    fn travel(&mut self, id: AgentId, society: SocietyId, now: f64) -> StepOutcome {
        let target = match self.active_target(id) {
            Ok(target) => target,
            Err(reason) => return self.abort(id, society, reason, now),
        };

        let near = match (
            self.collab.navigation.position(id),
            self.collab.navigation.position(target.provider),
        ) {
            (Some(here), Some(there)) => here.distance(there) <= self.state.policy.interaction_distance,
            _ => false,
        };
        if near {
            let open = self.collab.schedule.is_trade_capable_now(target.provider, now)
                || self.state.anchors.trade_anywhere(target.anchor);
            if open && self.try_claim(target.provider, id, now) {
                trace!(agent = %id, provider = %target.provider, "Midway trade");
                return self.execute(id, society, target, now);
            }
        }

        if self.collab.navigation.has_arrived(id) {
            return self.arrive(id, society, target, now);
        }
        StepOutcome::Waiting
    }

    /// Join the provider's queue, then run the queued step right away.
    fn arrive(&mut self, id: AgentId, society: SocietyId, target: Target, now: f64) -> StepOutcome {
        let state = &mut *self.state;
        let capacity = state
            .anchors
            .queue_capacity(target.anchor, state.policy.default_queue_capacity);
        let slot = match state.queues.enqueue(target.provider, id, now, capacity) {
            Ok(slot) => slot,
            Err(err) => {
                debug!(agent = %id, error = %err, "Queue full");
                return self.fail_with(id, society, target, TradeFailReason::QueueFull, now);
            }
        };

        let slot_position = state.anchors.slot_position(target.anchor, slot);
        if let Some(agent) = state.agents.get_mut(id) {
            let request = &mut agent.request;
            request.stage = NegotiationStage::Queued;
            request.wait_start_time = Some(now);
            request.queue_slot_index = Some(slot);
            request.queue_slot_node = slot_position.map(|_| slot);
            self.collab.telemetry.append_event(
                TradeEvent::new(EventKind::Enqueued, now, society, id)
                    .with_target(target.provider)
                    .with_ids(&request.need_id, &request.resource_id)
                    .with_value(slot_value(slot)),
            );
        }
        if let Some(position) = slot_position {
            self.collab.navigation.set_destination(id, position);
        }
        self.wait_in_queue(id, society, now)
    }

    // -----------------------------------------------------------------------
    // Queued
    // -----------------------------------------------------------------------

    /// Trade when first in line and the provider is free; otherwise hold
    /// the slot until the wait times out.
    fn wait_in_queue(&mut self, id: AgentId, society: SocietyId, now: f64) -> StepOutcome {
        let target = match self.active_target(id) {
            Ok(target) => target,
            Err(reason) => return self.abort(id, society, reason, now),
        };
        if self.state.queues.position(target.provider, id).is_none() {
            return self.arrive(id, society, target, now);
        }

        if self.state.queues.is_first(target.provider, id) && self.try_claim(target.provider, id, now) {
            return self.execute(id, society, target, now);
        }

        let Some(request) = self.state.agents.get(id).map(|a| &a.request) else {
            return StepOutcome::Idle;
        };
        let waited = now - request.wait_start_time.unwrap_or(now);
        if waited >= self.state.policy.queue_wait_timeout_hours {
            return self.fail_with(id, society, target, TradeFailReason::ProviderTimeout, now);
        }

        if let Some(position) = request
            .queue_slot_index
            .and_then(|slot| self.state.anchors.slot_position(target.anchor, slot))
        {
            self.collab.navigation.set_destination(id, position);
        }
        StepOutcome::Waiting
    }

    // -----------------------------------------------------------------------
    // Execution and terminal transitions
    // -----------------------------------------------------------------------

    /// Run the trade with the claimed provider and settle the intent.
    fn execute(&mut self, id: AgentId, society: SocietyId, target: Target, now: f64) -> StepOutcome {
        let state = &mut *self.state;
        let tick = state.clock.tick();
        let Some(agent) = state.agents.get(id) else {
            return StepOutcome::Idle;
        };
        let remaining = agent.request.desired_amount;
        let need_id = agent.request.need_id.clone();
        let Some(resolved) = agent.settings.resolve(&need_id, &agent.request.resource_id) else {
            return self.abort(id, society, TradeFailReason::UrgencyDropped, now);
        };

        let Some((requester, provider)) = state.agents.pair_mut(id, target.provider) else {
            return self.abort(id, society, TradeFailReason::ProviderMissing, now);
        };
        let outcome = execute_trade(
            requester,
            provider,
            &resolved,
            remaining,
            &state.policy,
            &state.affinity_defaults,
        );
        state.queues.remove(target.provider, id);

        let amount = match outcome {
            TradeOutcome::Success { amount, .. } => amount,
            TradeOutcome::Rejected { .. } => {
                return self.fail_with(id, society, target, TradeFailReason::Rejected, now);
            }
            TradeOutcome::NoResource => {
                return self.fail_with(id, society, target, TradeFailReason::NoResource, now);
            }
        };

        record_transfer(
            &mut state.ledger,
            tick,
            &resolved.resource_id,
            amount,
            target.provider,
            id,
            state.policy.consume_on_resolve,
        );
        state
            .queues
            .set_busy_until(target.provider, now + state.policy.trade_duration_hours);

        let remember = state.policy.remember_provider_anchor
            && self.collab.schedule.is_trade_capable_now(target.provider, now);
        if let Some(agent) = state.agents.get_mut(id) {
            if remember {
                agent.known_provider_anchors.insert(target.provider, target.anchor);
            }
            let left = remaining - amount;
            let urgency = agent.needs.urgency(&need_id).unwrap_or(0.0);
            if left <= AMOUNT_EPSILON || urgency <= state.policy.min_urgency_to_keep {
                agent.intents.remove(target.intent);
            } else if let Some(intent) = agent.intents.get_mut(target.intent) {
                intent.desired_amount = left;
                intent.attempt_count = 0;
                intent.next_attempt_time = now;
            }
            agent.end_search();
            agent.clear_request();
        }
        self.collab.navigation.clear_destination(id);
        self.collab.schedule.clear_override(id);

        debug!(
            tick,
            agent = %id,
            provider = %target.provider,
            resource = %resolved.resource_id,
            amount,
            "Trade succeeded"
        );
        self.collab.telemetry.append_event(
            TradeEvent::new(EventKind::TradeSuccess, now, society, id)
                .with_target(target.provider)
                .with_ids(&need_id, &resolved.resource_id)
                .with_value(amount),
        );
        self.emit_signal("trade.success", amount, id, target.provider, society, &resolved.resource_id);
        StepOutcome::Traded {
            provider: target.provider,
            amount,
        }
    }

    /// Leave any queue, return to idle and charge the intent for the
    /// failure when the reason consumes an attempt.
    fn fail(
        &mut self,
        id: AgentId,
        society: SocietyId,
        intent_id: IntentId,
        provider: Option<AgentId>,
        reason: TradeFailReason,
        now: f64,
    ) -> StepOutcome {
        let state = &mut *self.state;
        if let Some(provider) = provider {
            state.queues.remove(provider, id);
        }
        let Some(agent) = state.agents.get_mut(id) else {
            return StepOutcome::Failed(reason);
        };
        if let Some(provider) = provider.filter(|_| reason.excludes_provider()) {
            agent.exclude_provider(provider);
        }
        if !agent.request.is_idle() {
            agent.clear_request();
            self.collab.navigation.clear_destination(id);
            self.collab.schedule.clear_override(id);
        }

        let (need_id, resource_id) = agent
            .intents
            .get(intent_id)
            .map(|i| (i.need_id.clone(), i.resource_id.clone()))
            .unwrap_or_default();
        let mut failed = TradeEvent::new(EventKind::TradeFailed, now, society, id)
            .with_ids(&need_id, &resource_id)
            .with_reason(reason);
        if let Some(provider) = provider {
            failed = failed.with_target(provider);
        }
        self.collab.telemetry.append_event(failed);
        debug!(agent = %id, ?reason, "Trade attempt failed");

        if reason.consumes_attempt() {
            let decision = agent
                .intents
                .get_mut(intent_id)
                .map(|intent| register_failure(intent, &state.policy, &mut agent.rng, now));
            match decision {
                Some(RetryDecision::Retry { backoff, .. }) => {
                    self.collab.telemetry.append_event(
                        TradeEvent::new(EventKind::RetryScheduled, now, society, id)
                            .with_ids(&need_id, &resource_id)
                            .with_reason(reason)
                            .with_value(hours_value(backoff)),
                    );
                }
                Some(RetryDecision::Drop { attempts }) => {
                    agent.intents.remove(intent_id);
                    agent.intents.suppress(need_id.clone());
                    agent.end_search();
                    debug!(agent = %id, attempts, "Intent dropped after repeated failures");
                    self.collab.telemetry.append_event(
                        TradeEvent::new(EventKind::IntentDropped, now, society, id)
                            .with_ids(&need_id, &resource_id)
                            .with_reason(reason)
                            .with_value(count_value(attempts)),
                    );
                }
                None => {}
            }
        }
        if reason == TradeFailReason::NoPartner {
            agent.end_search();
        }

        let counterpart = provider.unwrap_or(id);
        self.emit_signal("trade.failed", 1.0, id, counterpart, society, &resource_id);
        StepOutcome::Failed(reason)
    }

    /// [`Self::fail`] for a request whose provider is known.
    fn fail_with(
        &mut self,
        id: AgentId,
        society: SocietyId,
        target: Target,
        reason: TradeFailReason,
        now: f64,
    ) -> StepOutcome {
        self.fail(id, society, target.intent, Some(target.provider), reason, now)
    }

    /// Abandon the active request: release the queue slot, drop the intent
    /// and return to idle.
    fn abort(&mut self, id: AgentId, society: SocietyId, reason: TradeFailReason, now: f64) -> StepOutcome {
        let state = &mut *self.state;
        let Some(agent) = state.agents.get_mut(id) else {
            return StepOutcome::Aborted(reason);
        };
        let request = std::mem::take(&mut agent.request);
        if let Some(provider) = request.provider {
            state.queues.remove(provider, id);
        }
        if let Some(intent_id) = request.intent_id {
            agent.intents.remove(intent_id);
        }
        agent.end_search();
        self.collab.navigation.clear_destination(id);
        self.collab.schedule.clear_override(id);

        debug!(agent = %id, ?reason, stage = ?request.stage, "Request aborted");
        let mut event = TradeEvent::new(EventKind::Aborted, now, society, id)
            .with_ids(&request.need_id, &request.resource_id)
            .with_reason(reason);
        if let Some(provider) = request.provider {
            event = event.with_target(provider);
        }
        self.collab.telemetry.append_event(event);
        StepOutcome::Aborted(reason)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Validate the active request and return its provider, anchor and
    /// intent.
    fn active_target(&self, id: AgentId) -> Result<Target, TradeFailReason> {
        let agent = self
            .state
            .agents
            .get(id)
            .ok_or(TradeFailReason::ProviderMissing)?;
        let request = &agent.request;
        let intent = request
            .intent_id
            .filter(|i| agent.intents.get(*i).is_some())
            .ok_or(TradeFailReason::UrgencyDropped)?;
        let provider = request
            .provider
            .filter(|p| *p != id && self.state.agents.get(*p).is_some())
            .ok_or(TradeFailReason::ProviderMissing)?;
        let anchor = request
            .anchor
            .filter(|a| self.state.anchors.get(*a).is_some())
            .ok_or(TradeFailReason::ProviderMissing)?;
        Ok(Target {
            provider,
            anchor,
            intent,
        })
    }

    /// Claim `provider` for `requester` unless it is still busy from an
    /// earlier trade or already claimed by someone else this tick.
    fn try_claim(&mut self, provider: AgentId, requester: AgentId, now: f64) -> bool {
        now >= self.state.queues.busy_until(provider) && self.state.locks.lock(provider, requester)
    }

    fn emit_signal(
        &mut self,
        signal_id: &str,
        value: f32,
        subject: AgentId,
        target: AgentId,
        society: SocietyId,
        resource: &ResourceId,
    ) {
        self.collab.signals.emit(Signal {
            signal_id: signal_id.to_owned(),
            value,
            subject,
            target: (target != subject).then_some(target),
            society,
            context_id: resource.as_str().to_owned(),
        });
    }
}

/// Provider, anchor and intent of an active request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    /// Provider being negotiated with.
    provider: AgentId,
    /// Meeting anchor.
    anchor: AnchorId,
    /// Intent being pursued.
    intent: IntentId,
}

fn slot_value(slot: usize) -> f32 {
    u16::try_from(slot).map_or(f32::from(u16::MAX), f32::from)
}

fn count_value(count: u32) -> f32 {
    u16::try_from(count).map_or(f32::from(u16::MAX), f32::from)
}

#[allow(clippy::cast_possible_truncation)]
fn hours_value(hours: f64) -> f32 {
    hours as f32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_agents::{AgentSpec, TradePolicy};
    use hearth_events::{EventLog, SignalBuffer};
    use hearth_types::{Need, NeedSetting};
    use hearth_world::{FixedSchedule, Navigation, Position, Schedule, StepNavigator};

    use super::*;
    use crate::clock::WorldClock;
    use crate::providers::build_candidates;

    fn water() -> ResourceId {
        ResourceId::from("water")
    }

    fn thirst_setting() -> NeedSetting {
        NeedSetting {
            need_id: NeedId::from("thirst"),
            resource_id: water(),
            min: 0.0,
            max: 1.0,
            satisfaction_per_unit: 1.0,
            request_amount: 2.0,
            intent_threshold: 0.6,
        }
    }

    struct Fixture {
        state: SimulationState,
        nav: StepNavigator,
        schedule: FixedSchedule,
        log: EventLog,
        signals: SignalBuffer,
        requester: AgentId,
        provider: AgentId,
    }

    impl Fixture {
        fn new(policy: TradePolicy, own_water: f32) -> Self {
            let clock = WorldClock::from_parts(0, 0.25, 8.0).unwrap();
            let mut state = SimulationState::new(clock, policy, 11);
            let society = state.add_society("Riverside", 0.0).unwrap();
            let well = state
                .add_anchor("well", Position::new(0.0, 0.0), Vec::new(), true)
                .unwrap();
            let requester = state
                .spawn_agent(AgentSpec {
                    needs: vec![Need::new(NeedId::from("thirst"), 0.9, 0.0, 1.0)],
                    resources: vec![(water(), own_water)],
                    settings: vec![thirst_setting()],
                    ..AgentSpec::new("Ada", "villager", society)
                })
                .unwrap();
            let provider = state
                .spawn_agent(AgentSpec {
                    resources: vec![(water(), 5.0)],
                    trade_anchor: Some(well),
                    ..AgentSpec::new("Bo", "villager", society)
                })
                .unwrap();
            let mut nav = StepNavigator::new(4.0, 0.1);
            nav.place(requester, Position::new(10.0, 0.0));
            nav.place(provider, Position::new(0.0, 0.0));
            Self {
                state,
                nav,
                schedule: FixedSchedule::new(),
                log: EventLog::new(64),
                signals: SignalBuffer::new(),
                requester,
                provider,
            }
        }

        fn step(&mut self) -> StepOutcome {
            let candidates = build_candidates(&self.state.agents);
            let mut collab = Collaborators {
                navigation: &mut self.nav,
                schedule: &mut self.schedule,
                telemetry: &mut self.log,
                signals: &mut self.signals,
            };
            let mut negotiator = Negotiator::new(&mut self.state, &mut collab, &candidates);
            negotiator.advance(self.requester)
        }

        fn request(&self) -> &TradeRequestState {
            &self.state.agents.get(self.requester).unwrap().request
        }

        fn schedule_has_override(&self) -> bool {
            self.schedule.has_override(self.requester)
        }
    }

    fn always_accept() -> TradePolicy {
        TradePolicy {
            base_acceptance: 1.0,
            ..TradePolicy::default()
        }
    }

    #[test]
    fn idle_requester_selects_provider_and_travels() {
        let mut f = Fixture::new(always_accept(), 0.0);
        let outcome = f.step();
        assert_eq!(outcome, StepOutcome::Started { provider: f.provider });
        assert_eq!(f.request().stage, NegotiationStage::Traveling);
        assert_eq!(f.request().provider, Some(f.provider));
        assert!(f.schedule_has_override());
        assert_eq!(f.nav.destination(f.requester), Some(Position::new(0.0, 0.0)));
        assert_eq!(f.log.count(EventKind::IntentRaised), 1);
        assert_eq!(f.log.count(EventKind::ProviderSelected), 1);
    }

    #[test]
    fn own_stock_is_used_before_searching() {
        let mut f = Fixture::new(always_accept(), 3.0);
        let outcome = f.step();
        assert!(matches!(outcome, StepOutcome::ResolvedLocally { amount } if (amount - 2.0).abs() < 1e-5));
        let agent = f.state.agents.get(f.requester).unwrap();
        assert!(agent.intents.is_empty());
        assert!((agent.resources.amount(&water()) - 1.0).abs() < 1e-5);
        assert_eq!(f.log.count(EventKind::LocalResolve), 1);
        assert_eq!(f.state.ledger.len(), 1);
    }

    #[test]
    fn midway_trade_when_within_reach() {
        let mut f = Fixture::new(always_accept(), 0.0);
        f.nav.place(f.requester, Position::new(1.0, 0.0));
        assert!(matches!(f.step(), StepOutcome::Started { .. }));
        // The lock from selection is ours; the well allows trading anywhere.
        let outcome = f.step();
        assert!(matches!(outcome, StepOutcome::Traded { amount, .. } if (amount - 2.0).abs() < 1e-5));
        assert!(f.request().is_idle());
        let provider = f.state.agents.get(f.provider).unwrap();
        assert!((provider.resources.amount(&water()) - 3.0).abs() < 1e-5);
        assert!((f.signals.total("trade.success") - 2.0).abs() < 1e-5);
    }

    #[test]
    fn arrival_enqueues_and_trades_when_first() {
        let mut f = Fixture::new(always_accept(), 0.0);
        f.state.policy.interaction_distance = -1.0;
        assert!(matches!(f.step(), StepOutcome::Started { .. }));
        // Teleport onto the anchor to simulate arrival.
        f.nav.place(f.requester, Position::new(0.0, 0.0));
        f.nav.set_destination(f.requester, Position::new(0.0, 0.0));
        let outcome = f.step();
        assert!(matches!(outcome, StepOutcome::Traded { .. }));
        assert_eq!(f.log.count(EventKind::Enqueued), 1);
        assert_eq!(f.state.queues.len(f.provider), 0);
    }

    #[test]
    fn queue_wait_times_out() {
        let mut f = Fixture::new(always_accept(), 0.0);
        f.state.policy.interaction_distance = -1.0;
        f.state.policy.queue_wait_timeout_hours = 0.0;
        assert!(matches!(f.step(), StepOutcome::Started { .. }));
        f.state.queues.set_busy_until(f.provider, 100.0);
        f.nav.place(f.requester, Position::new(0.0, 0.0));
        f.nav.set_destination(f.requester, Position::new(0.0, 0.0));
        let outcome = f.step();
        assert_eq!(outcome, StepOutcome::Failed(TradeFailReason::ProviderTimeout));
        assert!(f.request().is_idle());
        let agent = f.state.agents.get(f.requester).unwrap();
        assert!(agent.is_excluded(f.provider));
        assert_eq!(agent.intents.iter().next().map(|i| i.attempt_count), Some(1));
        assert_eq!(f.state.queues.len(f.provider), 0);
    }

    #[test]
    fn calm_need_aborts_travel() {
        let mut f = Fixture::new(always_accept(), 0.0);
        assert!(matches!(f.step(), StepOutcome::Started { .. }));
        let need = NeedId::from("thirst");
        let agent = f.state.agents.get_mut(f.requester).unwrap();
        agent.needs.satisfy(&need, 1.0);
        let outcome = f.step();
        assert_eq!(outcome, StepOutcome::Aborted(TradeFailReason::UrgencyDropped));
        assert!(f.request().is_idle());
        assert!(!f.schedule_has_override());
        assert_eq!(f.nav.destination(f.requester), None);
    }

    #[test]
    fn lost_provider_aborts_and_drops_intent() {
        let mut f = Fixture::new(always_accept(), 0.0);
        assert!(matches!(f.step(), StepOutcome::Started { .. }));
        f.state.agents.get_mut(f.requester).unwrap().request.provider = Some(AgentId::new(99));
        let outcome = f.step();
        assert_eq!(outcome, StepOutcome::Aborted(TradeFailReason::ProviderMissing));
        assert!(f.state.agents.get(f.requester).unwrap().intents.is_empty());
        assert_eq!(f.log.count(EventKind::Aborted), 1);
    }

    #[test]
    fn rejection_excludes_provider_and_backs_off() {
        let policy = TradePolicy {
            base_acceptance: 0.0,
            affinity_weight: 0.0,
            ..TradePolicy::default()
        };
        let mut f = Fixture::new(policy, 0.0);
        f.nav.place(f.requester, Position::new(0.5, 0.0));
        assert!(matches!(f.step(), StepOutcome::Started { .. }));
        assert_eq!(f.step(), StepOutcome::Failed(TradeFailReason::Rejected));
        let agent = f.state.agents.get(f.requester).unwrap();
        assert!(agent.is_excluded(f.provider));
        let intent = agent.intents.iter().next().unwrap();
        assert_eq!(intent.attempt_count, 1);
        // Base delay of a quarter hour plus up to 0.1 h of jitter.
        assert!(intent.next_attempt_time >= 8.25);
        assert!(intent.next_attempt_time <= 8.35 + 1e-9);
        assert_eq!(f.log.count(EventKind::RetryScheduled), 1);
        assert!(f.request().is_idle());
    }

    #[test]
    fn no_partner_consumes_an_attempt() {
        let mut f = Fixture::new(always_accept(), 0.0);
        f.state
            .agents
            .get_mut(f.provider)
            .unwrap()
            .resources
            .take(&water(), 5.0);
        let outcome = f.step();
        assert_eq!(outcome, StepOutcome::Failed(TradeFailReason::NoPartner));
        let agent = f.state.agents.get(f.requester).unwrap();
        assert_eq!(agent.intents.iter().next().map(|i| i.attempt_count), Some(1));
        assert!(agent.search_intent.is_none());
    }
}
