//! Agent needs, resources, intents, affinity and trade execution for the
//! Hearth simulation.
//!
//! This crate contains the per-agent logic layer: everything that operates
//! on a single agent (or a requester/provider pair) without knowing about
//! queues, anchors or ticks. It sits between `hearth-types` (plain data)
//! and `hearth-core` (negotiation state machine and tick driver).
//!
//! # Modules
//!
//! - [`agent`] -- Agent record and creation ([`AgentManager`])
//! - [`backoff`] -- Retry bookkeeping after failed attempts
//! - [`config`] -- Negotiation protocol tunables ([`TradePolicy`])
//! - [`error`] -- Error types ([`AgentError`])
//! - [`intents`] -- Intent queue, raising, pruning and selection
//! - [`inventory`] -- Resource ledger
//! - [`needs`] -- Need ledger
//! - [`preference`] -- Provider preference multipliers
//! - [`resolve`] -- Need resolution against authored settings
//! - [`rng`] -- Per-agent deterministic random streams
//! - [`social`] -- Affinity graph and type-level defaults
//! - [`trade`] -- Acceptance roll, transfer computation, trade execution

pub mod agent;
pub mod backoff;
pub mod config;
pub mod error;
pub mod intents;
pub mod inventory;
pub mod needs;
pub mod preference;
pub mod resolve;
pub mod rng;
pub mod social;
pub mod trade;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentManager, AgentSpec};
pub use backoff::{RetryDecision, register_failure};
pub use config::TradePolicy;
pub use error::AgentError;
pub use intents::{IntentQueue, current_urgency};
pub use inventory::ResourceLedger;
pub use needs::NeedLedger;
pub use preference::{MultiplierCurve, PreferenceProfile};
pub use resolve::NeedSettings;
pub use rng::AgentRng;
pub use social::{AffinityDefaults, AffinityGraph, affinity_label, resolve_affinity};
pub use trade::{
    TradeOutcome, acceptance_probability, ambient_trade, compute_transfer, execute_trade,
    satisfy_from_stock,
};
