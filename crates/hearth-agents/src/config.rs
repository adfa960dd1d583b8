//! Tunable parameters of the trade negotiation protocol.
//!
//! [`TradePolicy`] bundles every knob the negotiation core reads: urgency
//! thresholds, retry and backoff, queueing, acceptance, transfer clamping
//! and the ambient-trade affinity deltas. The engine deserializes it from
//! the `trade` section of `hearth-config.yaml`; tests construct it with
//! [`TradePolicy::default`] and override fields as needed.

use serde::Deserialize;

use crate::error::AgentError;

/// Configuration for the negotiation protocol.
///
/// Times are simulated hours.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TradePolicy {
    /// Intents whose need urgency falls to this value or below are dropped
    /// (default: 0.05).
    pub min_urgency_to_keep: f32,

    /// Anchor-resolution retries per provider search (default: 3).
    pub max_provider_attempts_per_tick: u32,

    /// Failed attempts after which an intent is dropped; 0 means unlimited
    /// (default: 5).
    pub max_attempts: u32,

    /// Base retry delay (default: 0.25).
    pub backoff_base_hours: f64,

    /// Upper bound of the deterministic part of the retry delay (default: 2.0).
    pub backoff_max_hours: f64,

    /// Maximum random jitter added to every retry delay (default: 0.1).
    pub backoff_jitter_hours: f64,

    /// How long a requester may wait in a provider's queue (default: 1.0).
    pub queue_wait_timeout_hours: f64,

    /// Distance at which a traveling requester can trade midway (default: 1.5).
    pub interaction_distance: f32,

    /// Acceptance probability at neutral affinity (default: 0.5).
    pub base_acceptance: f32,

    /// Weight of provider-to-requester affinity in the acceptance roll
    /// (default: 0.4).
    pub affinity_weight: f32,

    /// Whether a transfer may never exceed the remaining need amount
    /// (default: true).
    pub clamp_to_need: bool,

    /// Whether traded resources are consumed immediately instead of being
    /// credited to the requester's inventory (default: true).
    pub consume_on_resolve: bool,

    /// Whether requesters draw from their society's shared pool before
    /// searching for a partner (default: true).
    pub use_society_pool: bool,

    /// Queue capacity for anchors without authored slots (default: 2).
    pub default_queue_capacity: usize,

    /// How long a provider stays busy after serving a trade (default: 0.0).
    pub trade_duration_hours: f64,

    /// Trade ticks per simulated hour for societies without their own rate;
    /// 0 processes the society every tick (default: 4.0).
    pub default_trade_tick_rate: f32,

    /// Whether a requester remembers a trade-capable provider's anchor after
    /// a successful trade (default: true).
    pub remember_provider_anchor: bool,

    /// Affinity change applied both ways after a successful ambient trade
    /// (default: 0.1).
    pub ambient_success_delta: f32,

    /// Affinity change applied both ways after a failed ambient trade
    /// (default: -0.05).
    pub ambient_failure_delta: f32,
}

impl Default for TradePolicy {
    fn default() -> Self {
        Self {
            min_urgency_to_keep: 0.05,
            max_provider_attempts_per_tick: 3,
            max_attempts: 5,
            backoff_base_hours: 0.25,
            backoff_max_hours: 2.0,
            backoff_jitter_hours: 0.1,
            queue_wait_timeout_hours: 1.0,
            interaction_distance: 1.5,
            base_acceptance: 0.5,
            affinity_weight: 0.4,
            clamp_to_need: true,
            consume_on_resolve: true,
            use_society_pool: true,
            default_queue_capacity: 2,
            trade_duration_hours: 0.0,
            default_trade_tick_rate: 4.0,
            remember_provider_anchor: true,
            ambient_success_delta: 0.1,
            ambient_failure_delta: -0.05,
        }
    }
}

impl TradePolicy {
    /// Deterministic part of the retry delay after `attempt_count` failures:
    ///
    /// ```text
    /// min(base * (1 + attempt_count), backoff_max)
    /// ```
    pub fn backoff_for_attempt(&self, attempt_count: u32) -> f64 {
        let scaled = self.backoff_base_hours * (1.0 + f64::from(attempt_count));
        scaled.min(self.backoff_max_hours)
    }

    /// Whether an intent that already failed `attempt_count` times has used
    /// up its retry budget.
    pub const fn attempts_exhausted(&self, attempt_count: u32) -> bool {
        self.max_attempts != 0 && attempt_count > self.max_attempts
    }

    /// Check the policy for values the protocol cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidPolicy`] naming the first offending field.
    pub fn validate(&self) -> Result<(), AgentError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.min_urgency_to_keep) {
            return Err(invalid("min_urgency_to_keep must lie in [0, 1]"));
        }
        if !unit.contains(&self.base_acceptance) {
            return Err(invalid("base_acceptance must lie in [0, 1]"));
        }
        if self.max_provider_attempts_per_tick == 0 {
            return Err(invalid("max_provider_attempts_per_tick must be at least 1"));
        }
        if self.backoff_base_hours < 0.0 || self.backoff_jitter_hours < 0.0 {
            return Err(invalid("backoff durations must not be negative"));
        }
        if self.backoff_max_hours < self.backoff_base_hours {
            return Err(invalid("backoff_max_hours must be at least backoff_base_hours"));
        }
        if self.queue_wait_timeout_hours < 0.0 || self.trade_duration_hours < 0.0 {
            return Err(invalid("timeouts must not be negative"));
        }
        if self.interaction_distance < 0.0 || self.default_trade_tick_rate < 0.0 {
            return Err(invalid("distances and rates must not be negative"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> AgentError {
    AgentError::InvalidPolicy {
        reason: reason.to_owned(),
    }
}
