//! Enumeration types shared across the simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Negotiation
// ---------------------------------------------------------------------------

/// Stage of a requester's negotiation state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegotiationStage {
    /// No active request.
    #[default]
    Idle,
    /// Moving toward the provider's anchor.
    Traveling,
    /// Holding a queue slot at the provider, waiting for its turn.
    Queued,
}

/// Why a negotiation attempt did not end in a transfer.
///
/// None of these are fatal; each is recovered locally by the state machine
/// (retry with backoff, re-search, or abort to idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TradeFailReason {
    /// No qualifying provider was found within the attempt cap.
    NoPartner,
    /// The provider declined the acceptance roll.
    Rejected,
    /// The provider had nothing to give at the moment of execution.
    NoResource,
    /// Every queue slot at the provider was taken.
    QueueFull,
    /// The requester waited in the queue longer than the policy allows.
    ProviderTimeout,
    /// The provider or anchor handle no longer resolves.
    ProviderMissing,
    /// The provider is already serving another requester this tick.
    ProviderBusy,
    /// The need lost its urgency before the trade completed.
    UrgencyDropped,
}

impl TradeFailReason {
    /// Whether the failed provider should be excluded from the rest of the
    /// current search episode.
    pub const fn excludes_provider(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::NoResource | Self::ProviderTimeout
        )
    }

    /// Whether the failure counts against the intent's retry budget.
    pub const fn consumes_attempt(self) -> bool {
        matches!(
            self,
            Self::NoPartner
                | Self::Rejected
                | Self::NoResource
                | Self::QueueFull
                | Self::ProviderTimeout
        )
    }

    /// Short lowercase label used in telemetry and logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoPartner => "no_partner",
            Self::Rejected => "rejected",
            Self::NoResource => "no_resource",
            Self::QueueFull => "queue_full",
            Self::ProviderTimeout => "provider_timeout",
            Self::ProviderMissing => "provider_missing",
            Self::ProviderBusy => "provider_busy",
            Self::UrgencyDropped => "urgency_dropped",
        }
    }
}

impl core::fmt::Display for TradeFailReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Kind of a structured telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A new intent was raised from an urgent need.
    IntentRaised,
    /// An intent was satisfied from the requester's own inventory.
    LocalResolve,
    /// An intent was satisfied (partly) from the society pool.
    PoolResolve,
    /// A provider was selected and travel began.
    ProviderSelected,
    /// The requester took a queue slot at the provider.
    Enqueued,
    /// A trade completed with a transfer.
    TradeSuccess,
    /// A trade attempt failed; the reason field carries why.
    TradeFailed,
    /// The request was aborted back to idle.
    Aborted,
    /// An intent was scheduled for a later retry.
    RetryScheduled,
    /// An intent was removed (satisfied, pruned, or out of attempts).
    IntentDropped,
    /// An ambient, rule-triggered trade was resolved.
    AmbientTrade,
}

impl EventKind {
    /// Short lowercase label used in logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::IntentRaised => "intent_raised",
            Self::LocalResolve => "local_resolve",
            Self::PoolResolve => "pool_resolve",
            Self::ProviderSelected => "provider_selected",
            Self::Enqueued => "enqueued",
            Self::TradeSuccess => "trade_success",
            Self::TradeFailed => "trade_failed",
            Self::Aborted => "aborted",
            Self::RetryScheduled => "retry_scheduled",
            Self::IntentDropped => "intent_dropped",
            Self::AmbientTrade => "ambient_trade",
        }
    }
}
