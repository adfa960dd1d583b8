//! Error types for the hearth-agents crate.
//!
//! Negotiation failures are not errors (see
//! [`TradeFailReason`](hearth_types::TradeFailReason)); the variants here
//! cover authoring and setup problems such as invalid policy values or
//! duplicate records.

use hearth_types::{AgentId, NeedId};

/// Errors that can occur while building or configuring agents.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A trade policy value is outside its valid range.
    #[error("invalid trade policy: {reason}")]
    InvalidPolicy {
        /// Description of the offending field.
        reason: String,
    },

    /// A need was registered twice in the same ledger.
    #[error("duplicate need: {0}")]
    DuplicateNeed(NeedId),

    /// Agent with the given handle was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Agent name already exists in the manager.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    /// The agent arena ran out of handles.
    #[error("agent handle space exhausted")]
    HandlesExhausted,
}
