//! Tick callback that logs periodic status lines.
//!
//! After every tick the callback folds the [`TickSummary`] into running
//! totals. Every `status_interval_ticks` ticks it logs one line for the
//! whole simulation and one per society.

use std::collections::BTreeMap;

use hearth_core::runner::TickCallback;
use hearth_core::{SimulationState, TickSummary};
use hearth_types::{SocietyId, TradeFailReason};
use tracing::{info, warn};

/// Running totals across the whole run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    /// Completed trades.
    pub trades: u64,
    /// Units moved by completed trades.
    pub units_traded: f32,
    /// Needs resolved from own stock or the society pool.
    pub local_resolutions: u64,
    /// Failures by reason.
    pub failures: BTreeMap<TradeFailReason, u64>,
    /// Ticks whose conservation audit found an anomaly.
    pub unbalanced_ticks: u64,
}

/// Callback that logs a status report every N ticks.
pub struct StatusCallback {
    interval: u64,
    totals: RunTotals,
    reports: u64,
}

impl StatusCallback {
    /// Create a callback that reports every `interval` ticks (0 disables
    /// reports but keeps the totals).
    pub const fn new(interval: u64) -> Self {
        Self {
            interval,
            totals: RunTotals {
                trades: 0,
                units_traded: 0.0,
                local_resolutions: 0,
                failures: BTreeMap::new(),
                unbalanced_ticks: 0,
            },
            reports: 0,
        }
    }

    /// Totals accumulated so far.
    pub const fn totals(&self) -> &RunTotals {
        &self.totals
    }

    /// Number of status reports logged so far.
    pub const fn reports(&self) -> u64 {
        self.reports
    }

    fn accumulate(&mut self, summary: &TickSummary) {
        let totals = &mut self.totals;
        let trades = u64::try_from(summary.trades.len()).unwrap_or(u64::MAX);
        totals.trades = totals.trades.saturating_add(trades);
        totals.units_traded += summary.trades.iter().map(|t| t.amount).sum::<f32>();
        totals.local_resolutions = totals
            .local_resolutions
            .saturating_add(u64::from(summary.local_resolutions));
        for (reason, count) in &summary.failures {
            let entry = totals.failures.entry(*reason).or_default();
            *entry = entry.saturating_add(u64::from(*count));
        }
        if !summary.conservation.is_balanced() {
            totals.unbalanced_ticks = totals.unbalanced_ticks.saturating_add(1);
            warn!(tick = summary.tick, "Conservation anomaly");
        }
    }

    fn report(&mut self, summary: &TickSummary, sim: &SimulationState) {
        self.reports = self.reports.saturating_add(1);
        info!(
            tick = summary.tick,
            hour = sim.clock.hour_of_day(),
            trades = self.totals.trades,
            units_traded = self.totals.units_traded,
            local_resolutions = self.totals.local_resolutions,
            failures = self.totals.failures.values().sum::<u64>(),
            waiting = summary.waiting,
            ledger_entries = sim.ledger.len(),
            "Simulation status"
        );

        let mut per_society: BTreeMap<SocietyId, (usize, usize, usize)> = BTreeMap::new();
        for agent in sim.agents.iter() {
            let row = per_society.entry(agent.society).or_default();
            row.0 = row.0.saturating_add(1);
            row.1 = row.1.saturating_add(agent.intents.len());
            if !agent.request.is_idle() {
                row.2 = row.2.saturating_add(1);
            }
        }
        for society in sim.societies.iter() {
            let (agents, intents, negotiating) =
                per_society.get(&society.id).copied().unwrap_or_default();
            info!(
                tick = summary.tick,
                society = %society.id,
                name = %society.name,
                agents,
                intents,
                negotiating,
                pool = society.pool.total(),
                "Society status"
            );
        }
    }
}

impl TickCallback for StatusCallback {
    fn on_tick(&mut self, summary: &TickSummary, sim: &SimulationState) {
        self.accumulate(summary);
        if summary.tick.checked_rem(self.interval) == Some(0) {
            self.report(summary, sim);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_agents::TradePolicy;
    use hearth_core::clock::WorldClock;
    use hearth_core::tick::TradeRecord;
    use hearth_types::AgentId;

    use super::*;

    fn state() -> SimulationState {
        let clock = WorldClock::from_parts(0, 0.25, 6.0).unwrap();
        let mut state = SimulationState::new(clock, TradePolicy::default(), 1);
        state.add_society("Riverside", 0.0).unwrap();
        state
    }

    fn summary(tick: u64) -> TickSummary {
        let mut summary = TickSummary::new(tick, Vec::new());
        summary.trades.push(TradeRecord {
            requester: AgentId::new(0),
            provider: AgentId::new(1),
            amount: 1.5,
        });
        summary.failures.insert(TradeFailReason::Rejected, 2);
        summary
    }

    #[test]
    fn reports_on_interval_ticks() {
        let sim = state();
        let mut callback = StatusCallback::new(2);
        for tick in 1..=5 {
            callback.on_tick(&summary(tick), &sim);
        }
        assert_eq!(callback.reports(), 2);
    }

    #[test]
    fn zero_interval_only_accumulates() {
        let sim = state();
        let mut callback = StatusCallback::new(0);
        for tick in 1..=3 {
            callback.on_tick(&summary(tick), &sim);
        }
        assert_eq!(callback.reports(), 0);
        let totals = callback.totals();
        assert_eq!(totals.trades, 3);
        assert!((totals.units_traded - 4.5).abs() < 1e-5);
        assert_eq!(totals.failures.get(&TradeFailReason::Rejected), Some(&6));
        assert_eq!(totals.unbalanced_ticks, 0);
    }
}
