//! Shared type definitions for the Hearth society simulation.
//!
//! This crate is the single source of truth for the handles, records and
//! enumerations used across the workspace. It carries no logic beyond
//! small invariant-preserving constructors.
//!
//! # Modules
//!
//! - [`ids`] -- Integer handles for arena entities and string keys for authored data
//! - [`enums`] -- Negotiation stages, failure reasons, telemetry event kinds
//! - [`structs`] -- Needs, resources, intents, negotiation state, queue entries

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EventKind, NegotiationStage, TradeFailReason};
pub use ids::{AgentId, AnchorId, IntentId, NeedId, ResourceId, SocietyId};
pub use structs::{
    AMOUNT_EPSILON, Intent, Need, NeedSetting, QueueEntry, ResolvedNeed, ResourceStack,
    TradeRequestState, clamp_finite,
};
