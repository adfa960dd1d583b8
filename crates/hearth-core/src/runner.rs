//! Simulation loop runner with operator controls.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks`
//! - **Paced ticks**: optional real-time sleep between ticks
//! - **Operator stop**: clean stop between two ticks
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::sync::Arc;

use tracing::{info, warn};

use crate::operator::{OperatorState, SimulationEndReason};
use crate::state::{Collaborators, SimulationState};
use crate::tick::{self, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Trades completed across the whole run.
    pub total_trades: u64,
}

/// Callback invoked after each tick completes.
///
/// Implementations can use this to log periodic status, collect summaries
/// for assertions, etc. The callback receives the tick summary and the
/// current simulation state.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// # Arguments
///
/// * `state` - Mutable simulation state (clock, societies, agents, queues)
/// * `collab` - Navigation, schedule, telemetry and signal collaborators
/// * `operator` - Shared operator control state
/// * `callback` - Called after each tick
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails unrecoverably.
pub async fn run_simulation(
    state: &mut SimulationState,
    collab: &mut Collaborators<'_>,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let mut total_trades: u64 = 0;

    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        societies = state.societies.len(),
        agents = state.agents.len(),
        "Simulation starting"
    );

    loop {
        // --- Check stop request (before tick) ---
        if operator.is_stop_requested() {
            info!("Operator stop requested");
            let reason = SimulationEndReason::OperatorStop;
            operator.set_end_reason(reason).await;
            return Ok(SimulationResult {
                end_reason: reason,
                final_summary: last_summary,
                total_ticks,
                total_trades,
            });
        }

        // --- Execute tick ---
        let summary = tick::run_tick(state, collab)?;
        total_ticks = total_ticks.saturating_add(1);
        let traded = u64::try_from(summary.trades.len()).unwrap_or(u64::MAX);
        total_trades = total_trades.saturating_add(traded);

        // --- Notify callback ---
        callback.on_tick(&summary, state);

        // --- Check tick limit (after tick) ---
        // summary.tick is the tick that just ran, so max_ticks = 5 stops
        // once tick 5 has completed.
        if operator.tick_limit_reached(summary.tick) {
            info!(
                tick = summary.tick,
                max_ticks = operator.max_ticks(),
                "Tick limit reached"
            );
            let reason = SimulationEndReason::MaxTicksReached;
            operator.set_end_reason(reason).await;
            return Ok(SimulationResult {
                end_reason: reason,
                final_summary: Some(summary),
                total_ticks,
                total_trades,
            });
        }

        last_summary = Some(summary);

        // --- Sleep for tick interval ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        total_trades = result.total_trades,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            trades = summary.trades.len(),
            waiting = summary.waiting,
            failures = summary.failure_count(),
            balanced = summary.conservation.is_balanced(),
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hearth_agents::TradePolicy;
    use hearth_events::{NullTelemetry, SignalBuffer};
    use hearth_world::{FixedSchedule, StepNavigator};

    use super::*;
    use crate::clock::WorldClock;
    use crate::config::SimulationBoundsConfig;

    fn bounds(max_ticks: u64) -> SimulationBoundsConfig {
        SimulationBoundsConfig {
            max_ticks,
            ..SimulationBoundsConfig::default()
        }
    }

    fn make_simulation_state() -> SimulationState {
        let clock = WorldClock::from_parts(0, 0.25, 6.0).unwrap();
        let mut state = SimulationState::new(clock, TradePolicy::default(), 42);
        state.add_society("Riverside", 0.0).unwrap();
        state
    }

    struct Harness {
        nav: StepNavigator,
        schedule: FixedSchedule,
        telemetry: NullTelemetry,
        signals: SignalBuffer,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                nav: StepNavigator::new(1.0, 0.1),
                schedule: FixedSchedule::new(),
                telemetry: NullTelemetry,
                signals: SignalBuffer::new(),
            }
        }

        async fn run(
            &mut self,
            state: &mut SimulationState,
            operator: &Arc<OperatorState>,
            callback: &mut dyn TickCallback,
        ) -> SimulationResult {
            let mut collab = Collaborators {
                navigation: &mut self.nav,
                schedule: &mut self.schedule,
                telemetry: &mut self.telemetry,
                signals: &mut self.signals,
            };
            run_simulation(state, &mut collab, operator, callback)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn bounded_by_max_ticks() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(0, &bounds(5)));
        let result = Harness::new()
            .run(&mut state, &operator, &mut NoOpCallback)
            .await;

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert_eq!(state.clock.tick(), 5);
        assert_eq!(
            operator.end_reason().await,
            Some(SimulationEndReason::MaxTicksReached)
        );
    }

    #[tokio::test]
    async fn operator_stop() {
        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(0, &bounds(0)));
        operator.request_stop();
        let result = Harness::new()
            .run(&mut state, &operator, &mut NoOpCallback)
            .await;

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 0);
        assert!(result.final_summary.is_none());
    }

    #[tokio::test]
    async fn tick_callback_is_called() {
        struct CountCallback {
            count: u64,
        }
        impl TickCallback for CountCallback {
            fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {
                self.count = self.count.saturating_add(1);
            }
        }

        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(0, &bounds(3)));
        let mut cb = CountCallback { count: 0 };
        let _ = Harness::new().run(&mut state, &operator, &mut cb).await;

        assert_eq!(cb.count, 3);
    }

    #[tokio::test]
    async fn callback_can_stop_the_run() {
        struct StopAfter {
            operator: Arc<OperatorState>,
            at: u64,
        }
        impl TickCallback for StopAfter {
            fn on_tick(&mut self, summary: &TickSummary, _state: &SimulationState) {
                if summary.tick >= self.at {
                    self.operator.request_stop();
                }
            }
        }

        let mut state = make_simulation_state();
        let operator = Arc::new(OperatorState::new(0, &bounds(0)));
        let mut cb = StopAfter {
            operator: Arc::clone(&operator),
            at: 2,
        };
        let result = Harness::new().run(&mut state, &operator, &mut cb).await;

        assert_eq!(result.end_reason, SimulationEndReason::OperatorStop);
        assert_eq!(result.total_ticks, 2);
        assert_eq!(result.final_summary.map(|s| s.tick), Some(2));
    }
}
