//! World clock, societies, negotiation and the tick loop for the Hearth
//! trade simulation.
//!
//! This crate owns the per-tick cycle that turns agents' needs into
//! intents and intents into negotiated trades: provider selection by
//! affinity, travel and queueing at meeting anchors, probabilistic
//! acceptance, transfers recorded in the ledger, and retry backoff.
//!
//! # Modules
//!
//! - [`arena`] -- Handle-indexed agent storage with paired mutable access.
//! - [`clock`] -- World clock with tick counter and hour-of-day.
//! - [`config`] -- Configuration loading from `hearth-config.yaml` into
//!   strongly-typed structs.
//! - [`negotiation`] -- The per-requester [`Negotiator`] state machine.
//! - [`operator`] -- Shared stop and tick-limit control state.
//! - [`providers`] -- Candidate building, affinity ranking, anchor
//!   resolution and per-tick provider locks.
//! - [`queue`] -- Provider waiting lines with fixed slot reservation.
//! - [`runner`] -- The async bounded simulation loop.
//! - [`society`] -- Society time, pools and the trade-tick throttle.
//! - [`state`] -- [`SimulationState`] and the external [`Collaborators`].
//! - [`tick`] -- The fixed-order tick cycle.
//!
//! [`Negotiator`]: negotiation::Negotiator
//! [`SimulationState`]: state::SimulationState
//! [`Collaborators`]: state::Collaborators

pub mod arena;
pub mod clock;
pub mod config;
pub mod negotiation;
pub mod operator;
pub mod providers;
pub mod queue;
pub mod runner;
pub mod society;
pub mod state;
pub mod tick;

pub use arena::AgentArena;
pub use clock::WorldClock;
pub use config::SimulationConfig;
pub use negotiation::{Negotiator, StepOutcome};
pub use operator::{OperatorState, SimulationEndReason};
pub use runner::{NoOpCallback, SimulationResult, TickCallback, run_simulation};
pub use state::{Collaborators, SimulationState, StateError};
pub use tick::{TickSummary, run_tick};
