//! Trade telemetry events and the [`Telemetry`] sink interface.

use serde::{Deserialize, Serialize};

use hearth_types::{AgentId, EventKind, NeedId, ResourceId, SocietyId, TradeFailReason};

/// One structured negotiation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// What happened.
    pub kind: EventKind,
    /// Simulated time of the event.
    pub time: f64,
    /// Society of the subject.
    pub society: SocietyId,
    /// Agent the event is about (usually the requester).
    pub subject: AgentId,
    /// Counterpart, if any (usually the provider).
    pub target: Option<AgentId>,
    /// Need involved.
    pub need_id: NeedId,
    /// Resource involved.
    pub resource_id: ResourceId,
    /// Failure reason for failure-type events.
    pub reason: Option<TradeFailReason>,
    /// Event-specific value (transfer amount, backoff, urgency ...).
    pub value: f32,
}

impl TradeEvent {
    /// Start an event with no target, ids, reason or value.
    pub const fn new(kind: EventKind, time: f64, society: SocietyId, subject: AgentId) -> Self {
        Self {
            kind,
            time,
            society,
            subject,
            target: None,
            need_id: NeedId::empty(),
            resource_id: ResourceId::empty(),
            reason: None,
            value: 0.0,
        }
    }

    /// Set the counterpart.
    #[must_use]
    pub const fn with_target(mut self, target: AgentId) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the need and resource.
    #[must_use]
    pub fn with_ids(mut self, need_id: &NeedId, resource_id: &ResourceId) -> Self {
        self.need_id = need_id.clone();
        self.resource_id = resource_id.clone();
        self
    }

    /// Set the failure reason.
    #[must_use]
    pub const fn with_reason(mut self, reason: TradeFailReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Set the value.
    #[must_use]
    pub const fn with_value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }
}

/// Fire-and-forget sink for negotiation events.
///
/// Implementations must never block or fail the caller.
pub trait Telemetry {
    /// Record an event.
    fn append_event(&mut self, event: TradeEvent);
}

/// Telemetry sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn append_event(&mut self, _event: TradeEvent) {}
}
