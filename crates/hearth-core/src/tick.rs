//! Tick cycle: the fixed-order loop that drives the trade simulation.
//!
//! Each tick runs through these phases:
//!
//! 1. **Clock** -- advance the world clock by one tick.
//! 2. **Movement** -- step the navigation collaborator by the tick's hours.
//! 3. **Societies** -- advance every society's local time and collect the
//!    ones whose trade throttle grants a pass.
//! 4. **Decay** -- raise every agent's needs by the configured hourly rate
//!    scaled to its society's local time.
//! 5. **Negotiation** -- rebuild the provider candidate list, then advance
//!    each requester of a ready society exactly once, in handle order.
//! 6. **Audit** -- verify the ledger's conservation law for this tick and
//!    release the per-tick provider locks.
//!
//! Given the same initial state, seed and collaborators the tick cycle is
//! deterministic.

use std::collections::BTreeMap;

use hearth_ledger::ConservationResult;
use hearth_types::{AgentId, SocietyId, TradeFailReason};
use tracing::{debug, info, warn};

use crate::negotiation::{Negotiator, StepOutcome};
use crate::providers::build_candidates;
use crate::state::{Collaborators, SimulationState};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: crate::clock::ClockError,
    },
}

/// A completed transfer observed during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeRecord {
    /// Agent that received.
    pub requester: AgentId,
    /// Agent that gave.
    pub provider: AgentId,
    /// Units moved.
    pub amount: f32,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Societies whose requesters were advanced.
    pub ready_societies: Vec<SocietyId>,
    /// Number of requesters advanced.
    pub requesters_advanced: u32,
    /// Completed trades in execution order.
    pub trades: Vec<TradeRecord>,
    /// Intents covered by own stock or a society pool.
    pub local_resolutions: u32,
    /// Provider searches that started travel.
    pub started: u32,
    /// Failed attempts by reason.
    pub failures: BTreeMap<TradeFailReason, u32>,
    /// Requests abandoned this tick.
    pub aborts: u32,
    /// Requesters still traveling or queued.
    pub waiting: u32,
    /// Ledger conservation check for this tick.
    pub conservation: ConservationResult,
}

impl TickSummary {
    /// An empty summary for `tick`.
    pub const fn new(tick: u64, ready_societies: Vec<SocietyId>) -> Self {
        Self {
            tick,
            ready_societies,
            requesters_advanced: 0,
            trades: Vec::new(),
            local_resolutions: 0,
            started: 0,
            failures: BTreeMap::new(),
            aborts: 0,
            waiting: 0,
            conservation: ConservationResult::Balanced,
        }
    }

    /// Total failed attempts across all reasons.
    pub fn failure_count(&self) -> u32 {
        self.failures
            .values()
            .fold(0_u32, |acc, n| acc.saturating_add(*n))
    }

    fn record(&mut self, requester: AgentId, outcome: StepOutcome) {
        self.requesters_advanced = self.requesters_advanced.saturating_add(1);
        match outcome {
            StepOutcome::Idle => {}
            StepOutcome::ResolvedLocally { .. } => {
                self.local_resolutions = self.local_resolutions.saturating_add(1);
            }
            StepOutcome::Started { .. } => self.started = self.started.saturating_add(1),
            StepOutcome::Waiting => self.waiting = self.waiting.saturating_add(1),
            StepOutcome::Traded { provider, amount } => self.trades.push(TradeRecord {
                requester,
                provider,
                amount,
            }),
            StepOutcome::Failed(reason) => {
                let count = self.failures.entry(reason).or_insert(0);
                *count = count.saturating_add(1);
            }
            StepOutcome::Aborted(_) => self.aborts = self.aborts.saturating_add(1),
        }
    }
}

/// Execute one complete tick.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter overflows.
pub fn run_tick(
    state: &mut SimulationState,
    collab: &mut Collaborators<'_>,
) -> Result<TickSummary, TickError> {
    // --- Clock and movement ---
    let tick = state.clock.advance()?;
    let hours = state.clock.hours_per_tick();
    collab.navigation.step(hours);

    // --- Societies ---
    let ready = state.societies.advance_all(hours);
    debug!(tick, ready = ready.len(), "Societies advanced");

    // --- Decay ---
    phase_decay(state);

    // --- Negotiation ---
    let mut summary = TickSummary::new(tick, ready);
    let candidates = build_candidates(&state.agents);
    let requesters: Vec<AgentId> = state
        .agents
        .iter()
        .filter(|a| summary.ready_societies.contains(&a.society))
        .map(|a| a.id)
        .collect();
    {
        let mut negotiator = Negotiator::new(state, collab, &candidates);
        for requester in requesters {
            let outcome = negotiator.advance(requester);
            summary.record(requester, outcome);
        }
    }

    // --- Audit ---
    summary.conservation = state.ledger.verify_conservation(tick);
    if let ConservationResult::Anomaly(anomaly) = &summary.conservation {
        warn!(tick, %anomaly, "Ledger conservation violated");
    }
    if state.ledger_retention_ticks > 0 {
        let keep_from = tick
            .saturating_add(1)
            .saturating_sub(state.ledger_retention_ticks);
        let pruned = state.ledger.prune_before(keep_from);
        if pruned > 0 {
            debug!(tick, pruned, "Ledger history pruned");
        }
    }
    state.locks.clear();

    info!(
        tick,
        now = state.clock.now(),
        advanced = summary.requesters_advanced,
        trades = summary.trades.len(),
        local = summary.local_resolutions,
        failures = summary.failure_count(),
        aborts = summary.aborts,
        "Tick complete"
    );
    Ok(summary)
}

/// Grow every agent's needs by the hourly decay over its society's local
/// tick length.
#[allow(clippy::cast_possible_truncation)]
fn phase_decay(state: &mut SimulationState) {
    let rate = state.need_decay_per_hour;
    if rate <= 0.0 {
        return;
    }
    let deltas: BTreeMap<SocietyId, f32> = state
        .societies
        .iter()
        .map(|s| (s.id, s.delta_simulated_hours() as f32))
        .collect();
    for agent in state.agents.iter_mut() {
        if let Some(hours) = deltas.get(&agent.society) {
            agent.needs.decay_all(rate, *hours);
        }
    }
}
