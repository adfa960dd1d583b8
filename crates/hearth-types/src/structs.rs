//! Core data records: needs, resources, intents, negotiation state, queue
//! entries and authored need settings.
//!
//! These are plain data. The logic that mutates them lives in
//! `hearth-agents` (ledgers, intents, trade execution) and `hearth-core`
//! (negotiation and queues).

use serde::{Deserialize, Serialize};

use crate::enums::NegotiationStage;
use crate::ids::{AgentId, AnchorId, IntentId, NeedId, ResourceId};

/// Amounts at or below this magnitude are treated as zero.
pub const AMOUNT_EPSILON: f32 = 1.0e-4;

// ---------------------------------------------------------------------------
// Needs and resources
// ---------------------------------------------------------------------------

/// A bounded scalar representing an unmet requirement.
///
/// The value always stays within `[min, max]`; every mutation path clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    /// Authored need identifier.
    pub id: NeedId,
    /// Current value.
    pub value: f32,
    /// Lower bound (fully satisfied).
    pub min: f32,
    /// Upper bound (fully urgent).
    pub max: f32,
}

impl Need {
    /// Create a need, normalizing swapped bounds and clamping the value.
    pub fn new(id: NeedId, value: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            id,
            value: clamp_finite(value, min, max),
            min,
            max,
        }
    }

    /// Normalized urgency in `[0, 1]`: how far the value sits above `min`.
    ///
    /// Degenerate bounds (`max <= min`) have no urgency.
    pub fn urgency(&self) -> f32 {
        let span = self.max - self.min;
        if span <= f32::EPSILON {
            return 0.0;
        }
        ((self.value - self.min) / span).clamp(0.0, 1.0)
    }

    /// Set the value, clamped to the bounds.
    pub fn set_value(&mut self, value: f32) {
        self.value = clamp_finite(value, self.min, self.max);
    }
}

/// A quantity of a resource held by an agent or a society pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStack {
    /// Authored resource identifier.
    pub id: ResourceId,
    /// Amount held; never stored below zero.
    pub amount: f32,
}

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// A pending goal to acquire a resource in order to satisfy a need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Identifier, unique within the owning agent's queue.
    pub id: IntentId,
    /// Need this intent resolves.
    pub need_id: NeedId,
    /// Resource wanted; may be empty and derived from need settings.
    pub resource_id: ResourceId,
    /// Amount wanted.
    pub desired_amount: f32,
    /// Urgency recorded when the intent was raised, in `[0, 1]`.
    pub urgency: f32,
    /// Number of failed attempts so far.
    pub attempt_count: u32,
    /// Simulated time of the last attempt, if any.
    pub last_attempt_time: Option<f64>,
    /// The intent is not retried before this simulated time.
    pub next_attempt_time: f64,
}

impl Intent {
    /// Whether the intent may be attempted at `now`.
    pub fn is_ready(&self, now: f64) -> bool {
        now >= self.next_attempt_time
    }
}

// ---------------------------------------------------------------------------
// Need settings (authored)
// ---------------------------------------------------------------------------

/// Authored per-need configuration of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeedSetting {
    /// Need this setting describes.
    pub need_id: NeedId,
    /// Resource that satisfies the need; may be empty.
    #[serde(default)]
    pub resource_id: ResourceId,
    /// Lower need bound.
    #[serde(default)]
    pub min: f32,
    /// Upper need bound.
    #[serde(default = "default_max")]
    pub max: f32,
    /// Need reduction per unit of resource consumed.
    #[serde(default = "default_one")]
    pub satisfaction_per_unit: f32,
    /// Amount requested when an intent is raised.
    #[serde(default = "default_one")]
    pub request_amount: f32,
    /// Urgency at or above which an intent is raised.
    #[serde(default = "default_intent_threshold")]
    pub intent_threshold: f32,
}

const fn default_max() -> f32 {
    1.0
}

const fn default_one() -> f32 {
    1.0
}

const fn default_intent_threshold() -> f32 {
    0.6
}

/// Concrete bounds and rates for an intent after resolving it against the
/// agent's need settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNeed {
    /// Need being satisfied (may be empty when only a resource was given).
    pub need_id: NeedId,
    /// Resource that satisfies it; never empty.
    pub resource_id: ResourceId,
    /// Lower need bound.
    pub min: f32,
    /// Upper need bound.
    pub max: f32,
    /// Need reduction per unit of resource.
    pub satisfaction_per_unit: f32,
    /// Default amount to request.
    pub request_amount: f32,
}

// ---------------------------------------------------------------------------
// Negotiation state
// ---------------------------------------------------------------------------

/// Per-requester memory of an in-flight negotiation.
///
/// Created on the first successful provider selection and reset to
/// [`TradeRequestState::default`] on completion, failure or abort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeRequestState {
    /// Current stage.
    pub stage: NegotiationStage,
    /// Intent being pursued.
    pub intent_id: Option<IntentId>,
    /// Need being satisfied.
    pub need_id: NeedId,
    /// Resource being acquired.
    pub resource_id: ResourceId,
    /// Amount still wanted from a provider.
    pub desired_amount: f32,
    /// Urgency when the request started.
    pub urgency: f32,
    /// Provider the requester is negotiating with.
    pub provider: Option<AgentId>,
    /// Anchor where the trade takes place.
    pub anchor: Option<AnchorId>,
    /// Simulated time the request started.
    pub start_time: f64,
    /// Simulated time the requester joined the provider's queue.
    pub wait_start_time: Option<f64>,
    /// Index of the reserved queue slot.
    pub queue_slot_index: Option<usize>,
    /// Navigation node reserved for the queue slot.
    pub queue_slot_node: Option<usize>,
    /// Whether a schedule override is active for this request.
    pub is_override: bool,
}

impl TradeRequestState {
    /// Whether no negotiation is in flight.
    pub fn is_idle(&self) -> bool {
        self.stage == NegotiationStage::Idle
    }
}

/// A requester waiting at a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Waiting requester.
    pub requester: AgentId,
    /// Simulated time the requester joined.
    pub enqueue_time: f64,
    /// Slot the requester occupies.
    pub slot_index: usize,
}

/// Clamp `value` into `[min, max]`, mapping NaN to the lower bound.
///
/// Never panics: swapped bounds are reordered first.
pub fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if value.is_nan() {
        return lo;
    }
    value.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_new_clamps_value_and_orders_bounds() {
        let need = Need::new(NeedId::from("thirst"), 3.0, 1.0, 0.0);
        assert!((need.min - 0.0).abs() < f32::EPSILON);
        assert!((need.max - 1.0).abs() < f32::EPSILON);
        assert!((need.value - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn urgency_is_normalized() {
        let need = Need::new(NeedId::from("hunger"), 5.0, 0.0, 10.0);
        assert!((need.urgency() - 0.5).abs() < 1.0e-6);
    }

    #[test]
    fn degenerate_bounds_have_no_urgency() {
        let need = Need::new(NeedId::from("x"), 1.0, 1.0, 1.0);
        assert!(need.urgency().abs() < f32::EPSILON);
    }

    #[test]
    fn nan_clamps_to_min() {
        let mut need = Need::new(NeedId::from("x"), 0.5, 0.0, 1.0);
        need.set_value(f32::NAN);
        assert!(need.value.abs() < f32::EPSILON);
    }

    #[test]
    fn need_setting_defaults_from_yaml_like_json() {
        let setting: NeedSetting =
            serde_json::from_str(r#"{"need_id":"thirst"}"#).unwrap_or_else(|_| NeedSetting {
                need_id: NeedId::empty(),
                resource_id: ResourceId::empty(),
                min: -1.0,
                max: -1.0,
                satisfaction_per_unit: -1.0,
                request_amount: -1.0,
                intent_threshold: -1.0,
            });
        assert_eq!(setting.need_id.as_str(), "thirst");
        assert!((setting.max - 1.0).abs() < f32::EPSILON);
        assert!((setting.intent_threshold - 0.6).abs() < f32::EPSILON);
    }
}
