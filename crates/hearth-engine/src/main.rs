//! Engine binary for the Hearth trade simulation.
//!
//! This is the main entry point that wires together the configuration,
//! the demo population, the in-memory collaborators and the operator
//! controls. It runs the tick loop until the tick limit or Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `HEARTH_CONFIG` or `hearth-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the simulation state (clock, societies, pools)
//! 4. Spawn the demo population
//! 5. Create operator state and the Ctrl-C handler
//! 6. Run the simulation loop
//! 7. Log the result and dump retained events

mod error;
mod spawner;
mod status_callback;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hearth_core::config::SimulationConfig;
use hearth_core::operator::OperatorState;
use hearth_core::runner;
use hearth_core::state::{Collaborators, SimulationState};
use hearth_events::{EventLog, SignalBuffer};
use hearth_world::{FixedSchedule, StepNavigator};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::spawner::SpawnTargets;
use crate::status_callback::StatusCallback;

/// Config file used when `HEARTH_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "hearth-config.yaml";

/// Walking speed of demo agents in distance units per simulated hour.
const WALK_SPEED: f32 = 8.0;

/// Distance at which a walking agent counts as arrived.
const ARRIVAL_RADIUS: f32 = 0.5;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration before logging so the configured level applies.
    let (config, config_source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("hearth-engine starting");
    info!(
        source = %config_source,
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        hours_per_tick = config.time.hours_per_tick,
        "Configuration loaded"
    );

    // 3. Build the simulation state.
    let mut state = SimulationState::from_config(&config).map_err(EngineError::from)?;
    info!(
        societies = state.societies.len(),
        start_hour = state.clock.hour_of_day(),
        "Simulation state initialized"
    );

    // 4. Spawn the demo population.
    let mut navigator = StepNavigator::new(WALK_SPEED, ARRIVAL_RADIUS);
    let mut schedule = FixedSchedule::new();
    let spawned = spawner::spawn_population(
        &config,
        &mut SpawnTargets {
            state: &mut state,
            navigator: &mut navigator,
            schedule: &mut schedule,
        },
    )?;
    info!(
        agents = spawned.agents.len(),
        anchors = spawned.anchors.len(),
        "Demo population spawned"
    );

    // 5. Create operator state and wire Ctrl-C to a clean stop.
    let operator = Arc::new(OperatorState::new(
        config.world.tick_interval_ms,
        &config.simulation,
    ));
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping after the current tick");
                    operator.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }
    info!(
        max_ticks = operator.max_ticks(),
        tick_interval_ms = operator.tick_interval_ms(),
        "Operator state initialized"
    );

    // 6. Run the simulation.
    let mut events = EventLog::new(config.logging.event_log_capacity);
    let mut signals = SignalBuffer::new();
    let mut callback = StatusCallback::new(config.logging.status_interval_ticks);
    let result = {
        let mut collab = Collaborators {
            navigation: &mut navigator,
            schedule: &mut schedule,
            telemetry: &mut events,
            signals: &mut signals,
        };
        runner::run_simulation(&mut state, &mut collab, &operator, &mut callback)
            .await
            .map_err(EngineError::from)?
    };

    // 7. Log results and dump events.
    runner::log_simulation_end(&result);
    let totals = callback.totals();
    info!(
        trades = totals.trades,
        units_traded = totals.units_traded,
        local_resolutions = totals.local_resolutions,
        unbalanced_ticks = totals.unbalanced_ticks,
        events_retained = events.len(),
        events_dropped = events.dropped(),
        signals = signals.signals().len(),
        "Run totals"
    );
    if let Some(path) = &config.logging.event_dump_path {
        dump_events(&events, Path::new(path))?;
    }

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "hearth-engine shutdown complete"
    );

    Ok(())
}

/// Load the simulation configuration.
///
/// Reads the path in `HEARTH_CONFIG`, falling back to
/// `hearth-config.yaml` in the working directory. A missing default file
/// means built-in defaults; a missing explicit file is an error.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    let explicit = std::env::var_os("HEARTH_CONFIG").map(PathBuf::from);
    let path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if explicit.is_some() || path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, path.display().to_string()));
    }
    Ok((SimulationConfig::default(), String::from("defaults")))
}

/// Write the retained events to `path` as JSON lines.
fn dump_events(events: &EventLog, path: &Path) -> Result<(), EngineError> {
    let mut writer = BufWriter::new(File::create(path)?);
    events.write_json_lines(&mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), events = events.len(), "Event log written");
    Ok(())
}
